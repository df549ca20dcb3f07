use crate::page::NodeId;

/// A candidate post discovered during a scan.
///
/// `node` is a non-owning handle into the host page. The host may remove
/// the element at any time; every consumer re-queries through `HostPage`
/// and treats a vanished node as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    /// Stable post identifier (`t3_`-style short id for tiles, URL-derived
    /// for opened posts).
    pub id: String,
    pub node: NodeId,
}

impl PostRef {
    pub fn new(id: impl Into<String>, node: NodeId) -> Self {
        Self {
            id: id.into(),
            node,
        }
    }
}
