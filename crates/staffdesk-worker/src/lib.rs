//! Background work that must never affect request handling.

pub mod reporting;

pub use reporting::{
    ErrorReport, ErrorReportQueue, ErrorReportQueueConfig, ErrorReporter, HttpErrorReporter,
    LogErrorReporter,
};
