//! Object-store configuration
//!
//! A [`StoreConfig`] is resolved once at process start (config file, then
//! environment) and handed to the file handler explicitly. Nothing in the
//! handler reads ambient process state after that point.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default location of the YAML configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "s3config/config.yaml";

/// Environment variable holding the store endpoint (host[:port])
pub const ENV_ENDPOINT: &str = "S3_ENDPOINT";

/// Environment variable holding the access key id
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";

/// Environment variable holding the secret access key
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Optional environment variable overriding the region
pub const ENV_REGION: &str = "AWS_REGION";

const DEFAULT_REGION: &str = "us-east-1";

/// Immutable object-store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store endpoint without scheme, e.g. `minio.local:9000`. Empty when unconfigured.
    pub endpoint: String,

    /// Access key id
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Signing region
    pub region: String,

    /// Talk to the endpoint over https
    pub use_tls: bool,

    /// Force path-style addressing (required by most S3-compatible stores)
    pub force_path_style: bool,

    /// Retry configuration for transient transport errors
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::unconfigured()
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_retries: u32,

    /// Delay before the first retry, doubled on every attempt
    #[serde(with = "millis_serde")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// On-disk layout of the YAML config file
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "S3_ENDPOINT")]
    endpoint: String,
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    access_key_id: String,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    secret_access_key: String,
    #[serde(rename = "AWS_REGION", default)]
    region: Option<String>,
}

impl StoreConfig {
    /// Build a configuration from explicit values
    pub fn new(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: DEFAULT_REGION.to_string(),
            use_tls: true,
            force_path_style: true,
            retry: RetryConfig::default(),
        }
    }

    /// A configuration with no store at all; only local paths will work
    pub fn unconfigured() -> Self {
        Self::new("", "", "")
    }

    /// Set the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Use plain http instead of https
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Whether an object store has been configured
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }

    /// Full endpoint URL handed to the S3 client
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else if self.use_tls {
            format!("https://{}", self.endpoint)
        } else {
            format!("http://{}", self.endpoint)
        }
    }

    /// Read the YAML config file at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let file: ConfigFile = serde_yaml::from_str(&raw)?;

        debug!(path = %path.display(), endpoint = %file.endpoint, "Loaded store configuration file");
        let config = Self::new(file.endpoint, file.access_key_id, file.secret_access_key);
        Ok(match file.region {
            Some(region) => config.with_region(region),
            None => config,
        })
    }

    /// Read the configuration from process environment variables
    ///
    /// Returns `None` unless endpoint, access key and secret key are all set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_ENDPOINT)?;
        let access_key_id = lookup(ENV_ACCESS_KEY_ID)?;
        let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY)?;
        let config = Self::new(endpoint, access_key_id, secret_access_key);
        Some(match lookup(ENV_REGION) {
            Some(region) => config.with_region(region),
            None => config,
        })
    }

    /// Resolve the configuration from [`DEFAULT_CONFIG_PATH`], then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Resolve the configuration from `path`, then the environment
    ///
    /// Falls back to [`StoreConfig::unconfigured`] when neither source is
    /// available. A file that exists but cannot be parsed is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        match Self::from_env() {
            Some(config) => Ok(config),
            None => {
                warn!(
                    "S3 connection could not be configured. No config file was found. \
                     File handler will only work for local files!"
                );
                Ok(Self::unconfigured())
            }
        }
    }
}

/// Duration serialization as milliseconds
mod millis_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
