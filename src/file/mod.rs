//! File hosting core: records, on-disk layout, chunk sessions,
//! quota enforcement and the service facade.

pub mod chunks;
pub mod paths;
pub mod quota;
pub mod record;
pub mod service;
pub mod stats;
pub mod store;

pub use chunks::{ChunkAssembler, UploadSession};
pub use paths::StoragePaths;
pub use record::FileRecord;
pub use service::{DeleteOutcome, FileHost, IncomingFile, UploadOutcome, DEFAULT_CHUNK_SIZE};
pub use stats::StatsSummary;
pub use store::{FilePage, ListQuery, MetadataStore, SortKey};
