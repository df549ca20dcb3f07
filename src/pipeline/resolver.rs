//! Page model resolution: what kind of page is the user looking at?

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::domain::{PageKind, PageState};
use crate::page::{selectors, HostPage};

/// Permalink segment carrying the short post id.
pub(crate) static COMMENTS_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/comments/([a-z0-9]+)").expect("valid comments regex"));

static SUBREDDIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/r/([^/]+)/comments/").expect("valid subreddit regex"));

/// A permalink segment in the URL path means an opened post, overriding
/// every other signal. Absent that, the rendered search containers
/// distinguish the two search kinds; everything else degrades to `Feed`
/// (an unrecognized page simply yields zero candidates).
pub fn resolve_page(page: &dyn HostPage) -> PageState {
    let url = page.current_url();
    let kind = if is_opened_post_url(&url) {
        PageKind::OpenedPost
    } else if !page.query_all(selectors::SDUI_UNIT).is_empty() {
        PageKind::SearchSingleTerm
    } else if !page.query_all(selectors::SEARCH_PREVIEW).is_empty() {
        PageKind::SearchMultiTerm
    } else {
        PageKind::Feed
    };
    PageState { kind, url }
}

pub fn is_opened_post_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().contains("/comments/"),
        // relative or odd URLs: fall back to a substring check
        Err(_) => url.contains("/comments/"),
    }
}

/// Stable `t3_`-style post id derived from a permalink URL.
pub fn post_id_from_url(url: &str) -> Option<String> {
    COMMENTS_SEGMENT_RE
        .captures(url)
        .map(|caps| format!("t3_{}", &caps[1]))
}

/// Community name from an opened-post URL (`/r/<name>/comments/...`).
pub fn subreddit_from_url(url: &str) -> Option<String> {
    SUBREDDIT_RE.captures(url).map(|caps| caps[1].to_string())
}
