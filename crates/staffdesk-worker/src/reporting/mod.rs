mod queue;
mod report;
mod reporter;

pub use queue::{ErrorReportQueue, ErrorReportQueueConfig};
pub use report::ErrorReport;
pub use reporter::{ErrorReporter, HttpErrorReporter, LogErrorReporter};
