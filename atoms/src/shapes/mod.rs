pub mod ids;
pub mod model;

pub use ids::ShapeIdGenerator;
pub use model::{AnnotationSet, Point, Shape, ShapeKind, SurfaceSize};
