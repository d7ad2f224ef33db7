//! Chunked upload pipeline: initialize, receive chunks, assemble, cancel.

mod locks;
mod service;
mod types;
mod validation;

pub use service::ChunkedUploadService;
pub use types::{
    AssembledUpload, ChunkReceipt, InitializedUpload, ResumeInfo, UploadConfig, UploadError,
    UploadMetadata, UploadStatusReport,
};
pub use validation::{validate_filename, validate_relative_path};
