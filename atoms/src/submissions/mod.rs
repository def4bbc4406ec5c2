pub mod dynamo;
pub mod http;
pub mod memory;
pub mod model;
pub mod service;

pub use dynamo::DynamoSubmissionStore;
pub use http::*;
pub use memory::MemorySubmissionStore;
pub use model::{
    CreateSubmissionPayload, PatientDetails, Submission, SubmissionStatus, SubmissionUpdate,
};
pub use service::*;
