pub mod model;
pub mod service;

pub use model::{Actor, Role};
pub use service::*;
