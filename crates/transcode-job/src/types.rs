//! Shared value types for a transcoder job

use std::fmt;

use k8s_openapi::api::core::v1::Pod;

use crate::config::SecretKeyRef;

/// Value of a single environment entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// Plain value copied into the Pod spec
    Literal(String),
    /// Resolved by the kubelet from a Secret at container start
    SecretKeyRef(SecretKeyRef),
}

/// One environment variable for the worker container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    /// Variable name, unique within a job
    pub name: String,
    /// Literal or indirect value
    pub value: EnvValue,
}

impl EnvEntry {
    /// Entry with a literal value
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Literal(value.into()),
        }
    }

    /// Entry resolved from a Secret key
    pub fn from_secret(name: impl Into<String>, secret: SecretKeyRef) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::SecretKeyRef(secret),
        }
    }
}

/// A claim mounted into the worker container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBinding {
    /// Volume name inside the Pod
    pub name: String,
    /// PersistentVolumeClaim backing the volume
    pub claim: String,
    /// Mount path in the container
    pub mount_path: String,
    /// Whether the container may write to it
    pub read_only: bool,
}

/// Identity of a created Pod
///
/// Only exists once the API server has accepted the Pod and assigned it a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Namespace the Pod lives in
    pub namespace: String,
    /// Server-generated Pod name
    pub name: String,
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Pod lifecycle phase as reported by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepted but not all containers are running yet
    Pending,
    /// Bound to a node with at least one container running
    Running,
    /// State could not be obtained, usually a node communication problem
    Unknown,
    /// All containers terminated and at least one failed
    Failed,
    /// All containers terminated successfully
    Succeeded,
}

impl Phase {
    /// Parse the `status.phase` string
    ///
    /// A Pod without a phase has not been processed yet and is treated as
    /// Pending. Anything unrecognized is Unknown.
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            None => Phase::Pending,
            Some("Pending") => Phase::Pending,
            Some("Running") => Phase::Running,
            Some("Failed") => Phase::Failed,
            Some("Succeeded") => Phase::Succeeded,
            Some(_) => Phase::Unknown,
        }
    }

    /// Read the phase of a fetched Pod
    pub fn from_pod(pod: &Pod) -> Self {
        Self::parse(pod.status.as_ref().and_then(|s| s.phase.as_deref()))
    }

    /// Whether the Pod will not change phase again
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Failed | Phase::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::PodStatus;

    use super::*;

    #[test]
    fn phase_parsing() {
        assert_eq!(Phase::parse(Some("Pending")), Phase::Pending);
        assert_eq!(Phase::parse(Some("Running")), Phase::Running);
        assert_eq!(Phase::parse(Some("Unknown")), Phase::Unknown);
        assert_eq!(Phase::parse(Some("Failed")), Phase::Failed);
        assert_eq!(Phase::parse(Some("Succeeded")), Phase::Succeeded);
        assert_eq!(Phase::parse(Some("Evicted")), Phase::Unknown);
        assert_eq!(Phase::parse(None), Phase::Pending);
    }

    #[test]
    fn only_failed_and_succeeded_are_terminal() {
        assert!(!Phase::Pending.is_terminal());
        assert!(!Phase::Running.is_terminal());
        assert!(!Phase::Unknown.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Succeeded.is_terminal());
    }

    #[test]
    fn phase_from_pod_status() {
        let mut pod = Pod::default();
        assert_eq!(Phase::from_pod(&pod), Phase::Pending);

        pod.status = Some(PodStatus {
            phase: Some("Succeeded".to_string()),
            ..Default::default()
        });
        assert_eq!(Phase::from_pod(&pod), Phase::Succeeded);
    }

    #[test]
    fn handle_display() {
        let handle = JobHandle {
            namespace: "plex".to_string(),
            name: "pms-elastic-transcoder-x7k2p".to_string(),
        };
        assert_eq!(handle.to_string(), "plex/pms-elastic-transcoder-x7k2p");
    }
}
