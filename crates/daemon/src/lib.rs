//! auto-push service library.
//!
//! Lifecycle, worker loop, signal handling and the single-instance guard
//! used by the `autopush` binary.

pub mod instance;
pub mod logging;
pub mod scheduler;
pub mod service;
pub mod signals;

pub use service::{Environment, Service, ServiceError, ServiceState};
