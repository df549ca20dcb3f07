pub mod post;
pub mod types;

pub use post::PostRef;
pub use types::{
    ClassificationResult, Label, PageKind, PageState, PanelView, PostContent, RelatedPost,
};
