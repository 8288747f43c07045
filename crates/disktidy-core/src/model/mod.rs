/// Data model shared by the scanner and the analysis passes.
pub mod record;
pub mod size;

pub use record::{DirectoryTask, DuplicateGroup, FileRecord};
