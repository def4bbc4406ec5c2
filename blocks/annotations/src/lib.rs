pub mod editor;
pub mod export;
pub mod render;
pub mod submissions;

pub use editor::{display_surface, AnnotationEditor, EditorState};
pub use export::EditorSnapshot;
