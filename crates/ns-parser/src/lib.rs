mod document;
mod scene;

pub use document::{load_document, DocumentFormat};
pub use scene::{merge_scenes, parse_instruction, parse_scenes, parse_script};
