//! Elastic transcoder - runs a transcoder invocation as an ephemeral Kubernetes Pod
//!
//! The media server invokes this binary in place of its local transcoder. The
//! invocation is rewritten, compiled into a Pod, submitted, watched until it
//! finishes, and deleted.
//!
//! # Modules
//!
//! - [`config`] - Deployment configuration read from the environment
//! - [`translate`] - Environment and argument rewriting
//! - [`compiler`] - Compiles translated inputs into an immutable job spec and Pod
//! - [`client`] - Pod create/get/delete behind a mockable trait
//! - [`controller`] - Submission, polling, cancellation race, and cleanup
//! - [`signal`] - SIGINT/SIGTERM to cancellation token
//! - [`types`] - Env entries, volume bindings, job handle, and Pod phase
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod client;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod error;
pub mod signal;
pub mod translate;
pub mod types;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
