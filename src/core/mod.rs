pub mod edit;
pub mod fanout;
pub mod html;
pub mod render;
pub mod table;

pub use crate::domain::model::{
    Destination, DestinationResult, ProcessingReport, ResponseBody, SubmissionPayload,
};
pub use crate::domain::ports::{StatusSink, Storage, WebhookTransport};
pub use crate::utils::error::Result;
