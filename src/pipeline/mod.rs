pub mod annotate;
pub mod extract;
pub mod resolver;
pub mod scan;
pub mod session;

pub use resolver::resolve_page;
pub use scan::Scanner;
pub use session::{DedupLedger, SessionState};
