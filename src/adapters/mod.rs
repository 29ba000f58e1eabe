// Adapters layer: concrete implementations for external systems (http, desktop integration).

pub mod desktop;
pub mod http;

pub use desktop::{SystemClipboard, SystemLauncher, TracingStatus};
pub use http::HttpTransport;
