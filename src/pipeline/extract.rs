//! Stable-id derivation and content extraction.
//!
//! A tile with no recognizable identifier is skipped entirely: no fetch,
//! no classify call, no retry. It simply stays unlabeled.

use crate::domain::PostContent;
use crate::page::{selectors, HostPage, NodeId};

use super::resolver::COMMENTS_SEGMENT_RE;

/// Stable id for a regular feed/search tile.
///
/// Derivation order: a `t3_`-prefixed `id` attribute, the `permalink`
/// attribute, then the first permalink anchor in the subtree (older
/// layouts).
pub fn tile_post_id(page: &dyn HostPage, node: NodeId) -> Option<String> {
    if let Some(id) = page.attr(node, "id") {
        if id.starts_with("t3_") {
            return Some(id);
        }
    }
    if let Some(permalink) = page.attr(node, "permalink") {
        if let Some(short) = short_id(&permalink) {
            return Some(format!("t3_{short}"));
        }
    }
    let anchor = page.query_within(node, selectors::PERMALINK_ANCHOR)?;
    let href = page.attr(anchor, "href")?;
    short_id(&href).map(|short| format!("t3_{short}"))
}

/// SDUI (title-only) search units expose their permalink only through
/// the title anchor.
pub fn sdui_post_id(page: &dyn HostPage, node: NodeId) -> Option<String> {
    let anchor = page.query_within(node, selectors::SDUI_TITLE_ANCHOR)?;
    let href = page.attr(anchor, "href")?;
    short_id(&href).map(|short| format!("t3_{short}"))
}

fn short_id(href: &str) -> Option<String> {
    COMMENTS_SEGMENT_RE
        .captures(href)
        .map(|caps| caps[1].to_string())
}

/// Title and body straight from the opened post's rendered subtree. The
/// full text is already on screen, so a network fetch would be redundant.
pub fn opened_post_content(page: &dyn HostPage, node: NodeId) -> Option<PostContent> {
    let title = page
        .query_within(node, selectors::POST_TITLE)
        .and_then(|n| page.text(n))
        .unwrap_or_default();
    let body = page
        .query_within(node, selectors::POST_BODY)
        .and_then(|n| page.text(n))
        .unwrap_or_default();

    let content = PostContent::new(title.trim(), body.trim());
    if content.title.is_empty() && content.body.is_empty() {
        None
    } else {
        Some(content)
    }
}

/// Below the minimum there is not enough signal to justify a classifier
/// call (empty/placeholder tiles).
pub fn has_enough_text(text: &str, min_len: usize) -> bool {
    text.chars().count() >= min_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{SimElement, SimPage};

    #[test]
    fn tile_id_prefers_the_id_attribute() {
        let page = SimPage::new("https://www.reddit.com/");
        let tile = page.add_element(
            None,
            SimElement::new(selectors::FEED_TILE)
                .attr("id", "t3_direct")
                .attr("permalink", "/r/news/comments/other1/t/"),
        );
        assert_eq!(tile_post_id(&page, tile).as_deref(), Some("t3_direct"));
    }

    #[test]
    fn tile_id_falls_back_to_permalink_then_anchor() {
        let page = SimPage::new("https://www.reddit.com/");
        let with_permalink = page.add_feed_tile("/r/news/comments/abc123/some_title/");
        assert_eq!(
            tile_post_id(&page, with_permalink).as_deref(),
            Some("t3_abc123")
        );

        let with_anchor = page.add_feed_tile_with_anchor("/r/news/comments/xyz9/t/");
        assert_eq!(tile_post_id(&page, with_anchor).as_deref(), Some("t3_xyz9"));
    }

    #[test]
    fn unidentifiable_tile_yields_none() {
        let page = SimPage::new("https://www.reddit.com/");
        let tile = page.add_element(None, SimElement::new(selectors::FEED_TILE));
        assert_eq!(tile_post_id(&page, tile), None);

        let odd_permalink = page.add_feed_tile("/user/someone/posts/1");
        assert_eq!(tile_post_id(&page, odd_permalink), None);
    }

    #[test]
    fn sdui_id_comes_from_the_title_anchor() {
        let page = SimPage::new("https://www.reddit.com/search/?q=x");
        let unit = page.add_sdui_unit("/r/news/comments/q8r2/t/");
        assert_eq!(sdui_post_id(&page, unit).as_deref(), Some("t3_q8r2"));

        let bare = page.add_element(None, SimElement::new(selectors::SDUI_UNIT));
        assert_eq!(sdui_post_id(&page, bare), None);
    }

    #[test]
    fn opened_post_content_reads_the_subtree() {
        let page = SimPage::new("https://www.reddit.com/r/news/comments/abc123/t/");
        let post = page.add_opened_post("  A headline ", "Body text here.");
        let content = opened_post_content(&page, post).expect("content");
        assert_eq!(content.title, "A headline");
        assert_eq!(content.body, "Body text here.");

        let empty = page.add_element(None, SimElement::new(selectors::OPENED_POST));
        assert_eq!(opened_post_content(&page, empty), None);
    }

    #[test]
    fn minimum_length_counts_characters() {
        assert!(!has_enough_text("short text yo", 20));
        assert!(has_enough_text("twenty characters !!", 20));
    }
}
