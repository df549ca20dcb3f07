pub mod logging;
pub mod shutdown;

pub use logging::init_tracing;
pub use shutdown::{Shutdown, ShutdownListener};
