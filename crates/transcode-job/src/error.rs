//! Error types for the elastic transcoder
//!
//! Variants mirror the stages of a run: configuration and argument problems
//! are caught before anything reaches the cluster, submission failures leave
//! nothing behind, and wait or cleanup failures carry the job name so the
//! operator can find the Pod.

use std::time::Duration;

use thiserror::Error;

/// Main error type for transcoder job operations
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable configuration (environment, working directory, kube config)
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's wrong
        message: String,
        /// Environment variable at fault, if any
        variable: Option<String>,
    },

    /// A recognized flag is missing the value that must follow it
    #[error("argument '{flag}' at position {index} has no following value")]
    ArgumentShape {
        /// The flag that was recognized
        flag: String,
        /// Position of the flag in the argument list
        index: usize,
    },

    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A bounded cluster call did not finish in time
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The call that timed out (create, get, delete)
        operation: &'static str,
        /// The bound that was exceeded
        after: Duration,
    },

    /// The API server answered with something we cannot use
    #[error("invalid response from API server: {message}")]
    InvalidResponse {
        /// Description of what was missing
        message: String,
    },

    /// Internal/operational error
    #[error("internal error: {message}")]
    Internal {
        /// Description of what failed
        message: String,
    },

    /// Creating the Pod failed; nothing exists to clean up
    #[error("error creating pod: {source}")]
    Submission {
        /// Why the create call failed
        source: Box<Error>,
    },

    /// Fetching the Pod phase failed while waiting for completion
    #[error("error waiting for pod {job:?} to complete: {source}")]
    Poll {
        /// Name of the Pod being watched
        job: String,
        /// Why the fetch failed
        source: Box<Error>,
    },

    /// The Pod reached the Failed phase
    #[error("pod {job:?} failed")]
    JobFailed {
        /// Name of the failed Pod
        job: String,
    },

    /// Deleting the Pod failed; the remote resource may be leaked
    #[error("error cleaning up pod {job:?}: {source}")]
    Cleanup {
        /// Name of the Pod that could not be deleted
        job: String,
        /// Why the delete call failed
        source: Box<Error>,
    },
}

impl Error {
    /// Create a configuration error without a specific variable
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            variable: None,
        }
    }

    /// Create a configuration error for a missing or empty environment variable
    pub fn missing_variable(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self::Configuration {
            message: format!("environment variable {variable} must be set and non-empty"),
            variable: Some(variable),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: msg.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }

    /// Wrap a create failure
    pub fn submission(source: Error) -> Self {
        Self::Submission {
            source: Box::new(source),
        }
    }

    /// Wrap a phase fetch failure for the given Pod
    pub fn poll(job: impl Into<String>, source: Error) -> Self {
        Self::Poll {
            job: job.into(),
            source: Box::new(source),
        }
    }

    /// Create a failed-job error for the given Pod
    pub fn job_failed(job: impl Into<String>) -> Self {
        Self::JobFailed { job: job.into() }
    }

    /// Wrap a delete failure for the given Pod
    pub fn cleanup(job: impl Into<String>, source: Error) -> Self {
        Self::Cleanup {
            job: job.into(),
            source: Box::new(source),
        }
    }

    /// Get the Pod name if this error is tied to a submitted job
    pub fn job(&self) -> Option<&str> {
        match self {
            Error::Poll { job, .. } | Error::JobFailed { job } | Error::Cleanup { job, .. } => {
                Some(job)
            }
            _ => None,
        }
    }

    /// Check if this error aborts the run without a wait outcome
    ///
    /// Poll and job failures end the wait but still go through cleanup, so
    /// they surface as an outcome rather than a fatal error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Poll { .. } | Error::JobFailed { .. })
    }

    /// Check if this is a Kubernetes "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube { source: kube::Error::Api(ae) } if ae.code == 404)
    }
}
