mod janitor;

pub use janitor::UploadJanitor;
