pub mod cleanup;
pub mod upload;

pub use cleanup::UploadJanitor;
pub use upload::{
    AssembledUpload, ChunkReceipt, ChunkedUploadService, InitializedUpload, ResumeInfo,
    UploadConfig, UploadError, UploadMetadata, UploadStatusReport,
};
