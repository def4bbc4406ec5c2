pub mod error;
pub mod media;
pub mod responses;
pub mod shapes;
pub mod submissions;
pub mod users;

pub use error::CoreError;
