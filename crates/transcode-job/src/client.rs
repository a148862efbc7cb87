//! Cluster client for worker Pods
//!
//! Provides a trait-based abstraction over the three Pod operations the
//! lifecycle needs, so the controller can be tested against a mock while
//! production code talks to the API server.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::Config;
use kube::{Client, ResourceExt};
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::compiler::TranscodeJobSpec;
use crate::error::Error;
use crate::types::{JobHandle, Phase};

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
///
/// Sits above every per-call lifecycle bound so the controller's own
/// timeouts are the ones that fire.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(330);

/// Trait abstracting worker Pod operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Create the Pod and return the identity the server assigned
    async fn create(&self, spec: &TranscodeJobSpec) -> Result<JobHandle, Error>;

    /// Fetch the current phase of a created Pod
    async fn phase(&self, handle: &JobHandle) -> Result<Phase, Error>;

    /// Delete a created Pod
    async fn delete(&self, handle: &JobHandle) -> Result<(), Error>;
}

/// Real client backed by the Pods API
pub struct KubeJobClient {
    client: Client,
}

impl KubeJobClient {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the inferred kube config (in-cluster or kubeconfig)
    pub async fn connect() -> Result<Self, Error> {
        let mut config = Config::infer()
            .await
            .map_err(|e| Error::configuration(format!("failed to infer kube config: {e}")))?;
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
        let client = Client::try_from(config)
            .map_err(|e| Error::configuration(format!("failed to create kube client: {e}")))?;
        Ok(Self::new(client))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl JobClient for KubeJobClient {
    async fn create(&self, spec: &TranscodeJobSpec) -> Result<JobHandle, Error> {
        let pod = spec.to_pod();
        if let Ok(manifest) = serde_json::to_string(&pod) {
            debug!(%manifest, "creating pod");
        }

        let created = self
            .pods(spec.namespace())
            .create(&PostParams::default(), &pod)
            .await?;

        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::invalid_response("created pod has no name"))?;
        let namespace = created
            .namespace()
            .unwrap_or_else(|| spec.namespace().to_string());

        info!(job = %name, namespace = %namespace, "pod created");
        Ok(JobHandle { namespace, name })
    }

    async fn phase(&self, handle: &JobHandle) -> Result<Phase, Error> {
        let pod = self.pods(&handle.namespace).get(&handle.name).await?;
        Ok(Phase::from_pod(&pod))
    }

    async fn delete(&self, handle: &JobHandle) -> Result<(), Error> {
        match self
            .pods(&handle.namespace)
            .delete(&handle.name, &DeleteParams::default())
            .await
            .map_err(Error::from)
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(job = %handle.name, "pod already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{CREATE_TIMEOUT, DELETE_TIMEOUT, POLL_TIMEOUT};

    #[test]
    fn read_timeout_outlasts_lifecycle_bounds() {
        for bound in [CREATE_TIMEOUT, POLL_TIMEOUT, DELETE_TIMEOUT] {
            assert!(DEFAULT_READ_TIMEOUT > bound, "{bound:?} is not covered");
        }
        assert!(DEFAULT_CONNECT_TIMEOUT < CREATE_TIMEOUT);
    }
}
