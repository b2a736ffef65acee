//! Client access to the record API.
//!
//! [`ContractionLog`] and [`HospitalDirectory`] keep a local copy of each
//! list and run calls through a [`RecordBackend`]: either [`HttpBackend`]
//! for a remote server or a [`RecordService`](crate::api::RecordService)
//! in the same process.

mod backend;
mod hooks;
mod http;

pub use backend::RecordBackend;
pub use hooks::{ContractionLog, HospitalDirectory};
pub use http::HttpBackend;
