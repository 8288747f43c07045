/// Analysis passes that run over the output of a walk, plus the junk-target
/// estimator that drives walks of its own.

pub mod clean_targets;
pub mod duplicates;
pub mod empty_dirs;

pub use clean_targets::{
    default_clean_targets, estimate_targets, CleanEstimate, CleanTarget, TargetEstimate,
    TargetKind,
};
pub use duplicates::{find_duplicates, find_duplicates_streaming, DuplicateSearch};
pub use empty_dirs::{find_empty_dirs, find_empty_dirs_streaming, EmptyDirSearch};
