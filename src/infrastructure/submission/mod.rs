//! Submission adapters

mod http;

pub use http::HttpReportSubmitter;
