//! Freeze cache for computation results.
//!
//! Results are persisted next to their input under a per-input files
//! directory, keyed by output extension and validated against a hash of the
//! input bytes. The project freezer mirrors those stores so they survive
//! clean checkouts.
/// Name of the visible project freezer directory.
pub const PROJECT_FREEZE_DIR: &str = "_freeze";
/// Subdirectory of a files directory holding frozen records.
pub const FREEZE_RESULTS_DIR: &str = "execute-results";
/// Suffix appended to an input stem to name its files directory.
pub const FILES_DIR_SUFFIX: &str = "_files";
/// Extension of a frozen record file.
pub const RECORD_EXT: &str = "json";

mod freezer;
mod hash;
mod paths;
mod reader;
mod types;
mod writer;

pub use freezer::{
    copy_from_project_freezer, copy_to_project_freezer, freezer_freeze_file,
    prune_project_freezer, prune_project_freezer_dir,
};
pub use paths::{freeze_result_file, input_files_dir, remove_freeze_results};
pub use reader::{defrost_execute_result, record_status, RecordStatus};
pub use types::{ComputationResult, IncludePoint, Includes};
pub use writer::freeze_execute_result;
