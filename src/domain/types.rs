use serde::{Deserialize, Serialize};

/// Bias classification outcome for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Left,
    Right,
    Neutral,
}

impl Label {
    /// Normalizes a classifier label string. Anything that is not
    /// left/right counts as neutral.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" => Label::Left,
            "right" => Label::Right,
            _ => Label::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Left => "left",
            Label::Right => "right",
            Label::Neutral => "neutral",
        }
    }

    /// Left or right. Only partisan labels feed the threshold monitor
    /// and the related-posts panel.
    pub fn is_partisan(&self) -> bool {
        matches!(self, Label::Left | Label::Right)
    }

    pub fn badge_text(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: Option<f32>,
}

/// What kind of page the current navigation state shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Single-post detail page. Feed scanning is suppressed here.
    OpenedPost,
    Feed,
    /// Single-term search results rendered as title-only SDUI units.
    SearchSingleTerm,
    /// Multi-term search results with content previews.
    SearchMultiTerm,
}

/// Recomputed on every scheduler tick; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub kind: PageKind,
    pub url: String,
}

/// Full title + body text of a post. Immutable once derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub title: String,
    pub body: String,
}

impl PostContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Combined text sent to the classifier: `title\nbody`, trimmed.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.title, self.body).trim().to_string()
    }
}

/// One counter-perspective post returned by the recommendation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPost {
    pub title: String,
    pub url: String,
    #[serde(default = "default_leaning")]
    pub leaning: Label,
}

fn default_leaning() -> Label {
    Label::Neutral
}

/// What the hover panel should currently render.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    /// A fetch is in flight; show a placeholder.
    Loading,
    /// Nothing fetched yet, or the fetch settled with nothing to show.
    Empty,
    Posts(Vec<RelatedPost>),
}
