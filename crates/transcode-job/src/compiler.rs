//! Job spec compilation
//!
//! Compiles translated inputs plus [`TranscoderConfig`] into an immutable
//! [`TranscodeJobSpec`], and renders that into the Pod sent to the API server.
//! Every worker gets the same shape:
//! - data and config claims mounted read-only, transcode claim read-write
//! - the claim token injected from a Secret, never as a literal
//! - pinned to amd64 nodes, since the worker image is built for one architecture
//! - a generated name, so concurrent sessions in a namespace don't collide

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PersistentVolumeClaimVolumeSource, Pod, PodSpec,
    SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::TranscoderConfig;
use crate::translate::{Translated, CLAIM_VAR};
use crate::types::{EnvEntry, EnvValue, VolumeBinding};

/// Prefix the API server extends into a unique Pod name
pub const GENERATE_NAME: &str = "pms-elastic-transcoder-";

/// Name of the single worker container
pub const CONTAINER_NAME: &str = "plex";

/// Node label used for architecture placement
pub const ARCH_LABEL: &str = "beta.kubernetes.io/arch";

/// Architecture the worker image is built for
pub const WORKER_ARCH: &str = "amd64";

/// Value for the name and managed-by labels
pub const APP_NAME: &str = "elastic-transcoder";

/// Immutable description of a worker Pod
///
/// Built once by [`compile_job`] before submission. Fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJobSpec {
    generate_name: String,
    namespace: String,
    image: String,
    command: Vec<String>,
    env: Vec<EnvEntry>,
    working_dir: String,
    volumes: Vec<VolumeBinding>,
    node_selector: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
}

/// Compile translated inputs into a job spec
pub fn compile_job(
    translated: Translated,
    config: &TranscoderConfig,
    working_dir: impl Into<String>,
) -> TranscodeJobSpec {
    let Translated { mut env, args } = translated;
    env.push(EnvEntry::from_secret(CLAIM_VAR, config.claim_secret.clone()));

    let volumes = vec![
        VolumeBinding {
            name: "data".to_string(),
            claim: config.claims.data.clone(),
            mount_path: "/data".to_string(),
            read_only: true,
        },
        VolumeBinding {
            name: "config".to_string(),
            claim: config.claims.config.clone(),
            mount_path: "/config".to_string(),
            read_only: true,
        },
        VolumeBinding {
            name: "transcode".to_string(),
            claim: config.claims.transcode.clone(),
            mount_path: "/transcode".to_string(),
            read_only: false,
        },
    ];

    TranscodeJobSpec {
        generate_name: GENERATE_NAME.to_string(),
        namespace: config.namespace.clone(),
        image: config.image.clone(),
        command: args,
        env,
        working_dir: working_dir.into(),
        volumes,
        node_selector: BTreeMap::from([(ARCH_LABEL.to_string(), WORKER_ARCH.to_string())]),
        labels: BTreeMap::from([
            ("app.kubernetes.io/name".to_string(), APP_NAME.to_string()),
            ("app.kubernetes.io/managed-by".to_string(), APP_NAME.to_string()),
        ]),
    }
}

impl TranscodeJobSpec {
    /// Prefix for the server-generated Pod name
    pub fn generate_name(&self) -> &str {
        &self.generate_name
    }

    /// Namespace the Pod is created in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Worker image
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Container command, argv\[0\] included
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Container environment
    pub fn env(&self) -> &[EnvEntry] {
        &self.env
    }

    /// Container working directory
    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    /// Mounted claims
    pub fn volumes(&self) -> &[VolumeBinding] {
        &self.volumes
    }

    /// Placement requirements
    pub fn node_selector(&self) -> &BTreeMap<String, String> {
        &self.node_selector
    }

    /// Render the Pod manifest
    pub fn to_pod(&self) -> Pod {
        let env = self.env.iter().map(to_env_var).collect();

        let mounts = self
            .volumes
            .iter()
            .map(|v| VolumeMount {
                name: v.name.clone(),
                mount_path: v.mount_path.clone(),
                read_only: Some(v.read_only),
                ..Default::default()
            })
            .collect();

        let volumes = self
            .volumes
            .iter()
            .map(|v| Volume {
                name: v.name.clone(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: v.claim.clone(),
                    read_only: None,
                }),
                ..Default::default()
            })
            .collect();

        Pod {
            metadata: ObjectMeta {
                generate_name: Some(self.generate_name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(self.labels.clone()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_selector: Some(self.node_selector.clone()),
                restart_policy: Some("Never".to_string()),
                containers: vec![Container {
                    name: CONTAINER_NAME.to_string(),
                    image: Some(self.image.clone()),
                    command: Some(self.command.clone()),
                    env: Some(env),
                    working_dir: Some(self.working_dir.clone()),
                    volume_mounts: Some(mounts),
                    ..Default::default()
                }],
                volumes: Some(volumes),
                ..Default::default()
            }),
            status: None,
        }
    }
}

fn to_env_var(entry: &EnvEntry) -> EnvVar {
    match &entry.value {
        EnvValue::Literal(value) => EnvVar {
            name: entry.name.clone(),
            value: Some(value.clone()),
            value_from: None,
        },
        EnvValue::SecretKeyRef(secret) => EnvVar {
            name: entry.name.clone(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.name.clone(),
                    key: secret.key.clone(),
                    optional: None,
                }),
                ..Default::default()
            }),
        },
    }
}
