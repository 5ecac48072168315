//! Test impact analysis driver.
//!
//! Diffs the checkout against the last commit with stored coverage, picks a
//! test sequence, runs the native or python test runtime, and stores the
//! resulting history locally or in an object store bucket.

pub mod changelist;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod sequence;
pub mod settings;
pub mod storage;

pub use changelist::{build_change_list, ChangeList, Git};
pub use config::{RuntimeConfig, RuntimeType};
pub use driver::{run_tiaf, StorageBackend, TiaRequest, TiaResult, TESTS_FAILED_EXIT_CODE};
pub use error::TiafError;
pub use report::{RuntimeReport, TestResult, TestRun};
pub use sequence::{select_sequence, SequenceType};
pub use settings::TIAF_SETTINGS;
pub use storage::{HistoricData, LocalStorage, ObjectStorage, PersistentStorage, StorageKey};
