pub mod error;
pub mod generate;
pub mod layout;
pub mod pdf;
pub mod publisher;

pub use error::ReportError;
pub use generate::{fetch_report_images, generate_report, generate_report_handler, GeneratedReport};
pub use layout::{compose_layout, ImageSlot, ReportLayout, ReportSettings};
pub use pdf::{compose_report, render_report, report_layout, ReportImages};
pub use publisher::ReportPublisher;
