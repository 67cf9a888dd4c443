//! Generation engine: field walking, consolidation and emission

mod consolidate;
mod context;
mod emitter;
pub mod file_walker;
mod generate;
mod walker;

pub use consolidate::consolidate;
pub use context::{Diagnostic, EmissionKey, GenerationContext};
pub use emitter::{RecordOutput, emit_file, emit_record};
pub use file_walker::{FileEntry, FileWalker};
pub use generate::{FileOutcome, GenerationResult, Generator, WriteAction};
pub use walker::{LoopLevel, RuleGroup, Walker, walk_record};
