// Re-export model types and service functions
pub mod memory;
pub mod model;
pub mod service;

pub use memory::MemoryObjectStore;
pub use model::{content_type_for_extension, extension_of, original_image_key};
pub use service::*;
