//! `laborlog` - A labor contraction timer and hospital contact book
//!
//! This library records contractions, derives the rest intervals between
//! them, times contractions live and keeps a small hospital directory. The
//! records are served over HTTP/JSON and consumed through client-side views.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod intervals;
pub mod logging;
pub mod model;
pub mod stopwatch;
pub mod storage;

pub use api::RecordService;
pub use config::{Config, EndTimePolicy};
pub use error::{Error, Result};
pub use intervals::Interval;
pub use logging::init_logging;
pub use model::{Contraction, Hospital, HospitalPatch, NewHospital};
pub use storage::Storage;
