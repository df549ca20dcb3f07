use tokio::sync::broadcast;

use crate::domain::{Label, PanelView, RelatedPost};

/// Opaque handle to an element in the host document.
///
/// Handles are non-owning: the host page may remove the underlying element
/// at any time, after which every accessor returns `None`/`false`. Callers
/// never assume a handle stays valid across an `.await`.
pub type NodeId = u64;

/// Events pushed from the host into the scan scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// A batch of child-list/subtree mutations under the document body.
    Mutation,
    /// The user hovered the related-posts button; the panel wants content.
    PanelHover,
}

/// Bridge to the externally-owned document.
///
/// DOM access is synchronous by design: the pipeline's only suspension
/// points are HTTP calls and timers, so overlapping scans interleave only
/// there and the dedup ledger stays race-free without locks around reads.
pub trait HostPage: Send + Sync {
    fn current_url(&self) -> String;

    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<NodeId>;

    fn query_first(&self, selector: &str) -> Option<NodeId> {
        self.query_all(selector).into_iter().next()
    }

    /// First descendant of `node` matching `selector`.
    fn query_within(&self, node: NodeId, selector: &str) -> Option<NodeId>;

    /// Rendered text of the element. `None` when the node is gone.
    fn text(&self, node: NodeId) -> Option<String>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// Returns `false` when the node is gone.
    fn set_attr(&self, node: NodeId, name: &str, value: &str) -> bool;

    /// Appends the visible bias badge to the element.
    fn append_badge(&self, node: NodeId, label: Label) -> bool;

    /// Removes every badge and strips `marker_attr` from all elements
    /// (toggle-off teardown).
    fn clear_annotations(&self, marker_attr: &str);

    /// Mounts the related-posts button/panel chrome on the current page.
    /// Idempotent; the host keeps a single instance.
    fn mount_related_ui(&self);

    fn render_related_panel(&self, view: &PanelView);

    /// Tears down the related-posts button and panel immediately.
    fn remove_related_ui(&self);

    /// Shows the alternative-perspectives popup.
    fn show_popup(&self, recommendations: &[RelatedPost]);

    fn subscribe_events(&self) -> broadcast::Receiver<PageEvent>;
}
