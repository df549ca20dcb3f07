//! Annotation: the visible badge plus the persistent label marker.

use crate::domain::{ClassificationResult, Label};
use crate::page::{HostPage, NodeId};

/// Marker attribute written alongside the badge. The attribute, not the
/// badge, is the single source of truth other components read (threshold
/// monitor, related-posts controller), and it survives unrelated child
/// mutations on the element.
pub const LABEL_ATTR: &str = "data-bias-label";

pub fn already_labeled(page: &dyn HostPage, node: NodeId) -> bool {
    page.attr(node, LABEL_ATTR).is_some()
}

/// The resolved label previously written onto the element, if any.
pub fn label_of(page: &dyn HostPage, node: NodeId) -> Option<Label> {
    page.attr(node, LABEL_ATTR).map(|raw| Label::parse(&raw))
}

/// Writes the marker attribute and appends the badge. Idempotent: an
/// already-labeled element is left untouched. Returns whether the label
/// was applied (a vanished node is a no-op).
pub fn apply(page: &dyn HostPage, node: NodeId, result: &ClassificationResult) -> bool {
    if already_labeled(page, node) {
        return false;
    }
    // marker first: once it exists the element counts as labeled even if
    // the badge write loses a race with node removal
    if !page.set_attr(node, LABEL_ATTR, result.label.as_str()) {
        return false;
    }
    page.append_badge(node, result.label);
    true
}

pub fn clear_all(page: &dyn HostPage) {
    page.clear_annotations(LABEL_ATTR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::SimPage;

    fn left() -> ClassificationResult {
        ClassificationResult {
            label: Label::Left,
            confidence: Some(0.9),
        }
    }

    #[test]
    fn apply_writes_marker_and_badge_once() {
        let page = SimPage::new("https://www.reddit.com/");
        let tile = page.add_feed_tile("/r/news/comments/abc123/t/");

        assert!(apply(&page, tile, &left()));
        assert_eq!(page.badge_count(tile), 1);
        assert_eq!(label_of(&page, tile), Some(Label::Left));

        // second application is a no-op: no duplicate badge, label unchanged
        let right = ClassificationResult {
            label: Label::Right,
            confidence: None,
        };
        assert!(!apply(&page, tile, &right));
        assert_eq!(page.badge_count(tile), 1);
        assert_eq!(label_of(&page, tile), Some(Label::Left));
    }

    #[test]
    fn vanished_node_is_a_noop() {
        let page = SimPage::new("https://www.reddit.com/");
        let tile = page.add_feed_tile("/r/news/comments/abc123/t/");
        page.remove_element(tile);

        assert!(!apply(&page, tile, &left()));
        assert_eq!(page.badge_count(tile), 0);
        assert_eq!(label_of(&page, tile), None);
    }

    #[test]
    fn clear_all_removes_annotations() {
        let page = SimPage::new("https://www.reddit.com/");
        let tile = page.add_feed_tile("/r/news/comments/abc123/t/");
        apply(&page, tile, &left());

        clear_all(&page);
        assert_eq!(page.badge_count(tile), 0);
        assert!(!already_labeled(&page, tile));
    }
}
