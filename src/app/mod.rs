pub mod agents;
pub mod emission;
pub mod presenter;
pub mod processing;
#[cfg(feature = "cli")]
pub mod router;
pub mod session;
pub mod verification;

pub use processing::ProcessingEngine;
#[cfg(feature = "cli")]
pub use router::ActionRouter;
pub use session::Session;
