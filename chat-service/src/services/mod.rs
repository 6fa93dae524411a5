pub mod archive;
pub mod metrics;
pub mod providers;
pub mod storage;

pub use archive::ArchiveSink;
pub use self::metrics::{get_metrics, init_metrics};
pub use storage::{ArchiveError, LocalStorage, ObjectMeta, S3Storage, Storage};
