pub mod host;
pub mod sim;

pub use host::{HostPage, NodeId, PageEvent};
pub use sim::{SimElement, SimPage};

/// CSS selectors the host bridge resolves against the live document.
///
/// The simulated page treats these as opaque tags; a real bridge passes
/// them to the host's query machinery as-is.
pub mod selectors {
    /// The single post container on a detail page.
    pub const OPENED_POST: &str = "shreddit-post, [data-testid='post-container'], .Post";

    /// Post tiles on home-feed and listing pages (old and new layouts).
    pub const FEED_TILE: &str =
        "shreddit-post, shreddit-search-post, [data-testid='post-content'], [role='article']";

    /// Title-only SDUI result units shown for single-term searches.
    pub const SDUI_UNIT: &str = "[data-testid='sdui-post-unit']";

    /// Multi-term search results rendered with a content preview.
    pub const SEARCH_PREVIEW: &str = "[data-testid='search-post-with-content-preview']";

    pub const POST_TITLE: &str = "h1[data-testid='post-title'], h1, h2, [data-click-id='title']";
    pub const POST_BODY: &str =
        "shreddit-post-text-body, [data-testid='post-content'], .usertext-body";

    /// Fallback permalink anchor for tiles without an id/permalink attribute.
    pub const PERMALINK_ANCHOR: &str = "a[href*='/comments/']";

    /// SDUI units expose their permalink only through the title anchor.
    pub const SDUI_TITLE_ANCHOR: &str = "a[data-testid='post-title'][href*='/comments/']";
}
