//! Runtime configuration
//!
//! Everything the transcoder needs from its deployment is read once at
//! startup into a [`TranscoderConfig`] and passed down explicitly.

use crate::error::Error;

/// Claim backing the read-only media library mount
pub const DATA_PVC_VAR: &str = "DATA_PVC";
/// Claim backing the read-only server config mount
pub const CONFIG_PVC_VAR: &str = "CONFIG_PVC";
/// Claim backing the read-write transcode scratch mount
pub const TRANSCODE_PVC_VAR: &str = "TRANSCODE_PVC";
/// Namespace the Pod is created in
pub const NAMESPACE_VAR: &str = "KUBE_NAMESPACE";
/// Worker image; should match the image of the main media server
pub const IMAGE_VAR: &str = "PMS_IMAGE";
/// In-cluster address of the media server, substituted for loopback URLs
pub const INTERNAL_ADDRESS_VAR: &str = "PMS_INTERNAL_ADDRESS";
/// Secret holding the claim token
pub const CLAIM_SECRET_NAME_VAR: &str = "PLEX_CLAIM_SECRET_NAME";
/// Key within the claim secret
pub const CLAIM_SECRET_KEY_VAR: &str = "PLEX_CLAIM_SECRET_KEY";

/// Reference to a single key in a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Claim names for the three volumes every worker mounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimNames {
    /// Media library
    pub data: String,
    /// Server configuration
    pub config: String,
    /// Transcode scratch space
    pub transcode: String,
}

/// Static configuration for a transcoder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscoderConfig {
    /// Namespace the Pod is created in
    pub namespace: String,
    /// Worker container image
    pub image: String,
    /// Replacement for `http://127.0.0.1:32400` in URL-bearing arguments
    pub internal_address: String,
    /// Pre-provisioned claims
    pub claims: ClaimNames,
    /// Where the claim token lives
    pub claim_secret: SecretKeyRef,
}

impl TranscoderConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Every variable is required and must be non-empty. The first one that
    /// isn't is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String, Error> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::missing_variable(name))
        };

        Ok(Self {
            claims: ClaimNames {
                data: require(DATA_PVC_VAR)?,
                config: require(CONFIG_PVC_VAR)?,
                transcode: require(TRANSCODE_PVC_VAR)?,
            },
            namespace: require(NAMESPACE_VAR)?,
            image: require(IMAGE_VAR)?,
            internal_address: require(INTERNAL_ADDRESS_VAR)?,
            claim_secret: SecretKeyRef {
                name: require(CLAIM_SECRET_NAME_VAR)?,
                key: require(CLAIM_SECRET_KEY_VAR)?,
            },
        })
    }
}
