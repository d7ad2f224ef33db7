pub mod tenant;
pub mod upload;

pub use tenant::{NamespaceContext, TenantIdentity};
pub use upload::{UploadSession, UploadStatus};
