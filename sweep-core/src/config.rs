//! Run configuration
//!
//! A run is configured by a single YAML document, loaded once at startup and
//! never mutated afterwards. Intervals and timeouts are whole seconds on the
//! wire and exposed as [`Duration`]s.

use crate::instance::Plan;
use crate::operation::OperationType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Which bulk operation a run applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Recreate,
    Upgrade,
    Errand,
}

impl From<OperationKind> for OperationType {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Recreate => OperationType::Recreate,
            OperationKind::Upgrade => OperationType::Upgrade,
            OperationKind::Errand => OperationType::Errand,
        }
    }
}

/// Where task status is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSource {
    /// Query director tasks directly
    #[default]
    Director,

    /// Ask the broker's last-operation endpoint
    Broker,
}

/// Basic auth credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub basic: BasicAuth,
}

/// Location and credentials of an HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    pub authentication: Authentication,
}

impl ApiConfig {
    pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            authentication: Authentication {
                basic: BasicAuth {
                    username: username.into(),
                    password: password.into(),
                },
            },
        }
    }

    pub fn username(&self) -> &str {
        &self.authentication.basic.username
    }

    pub fn password(&self) -> &str {
        &self.authentication.basic.password
    }
}

/// Configuration for one bulk operation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorConfig {
    /// Operation applied to every instance
    pub operation: OperationKind,

    /// Errand to run when `operation` is `errand`
    #[serde(default)]
    pub errand_name: Option<String>,

    /// Offering whose instances are processed
    pub service_offering: String,

    /// Seconds between status checks
    pub polling_interval: u64,

    /// Seconds between trigger attempts
    pub attempt_interval: u64,

    /// Trigger attempts per instance, first attempt included
    pub attempt_limit: u32,

    /// Seconds allowed for a single collaborator request
    pub request_timeout: u64,

    /// Instances processed at the same time
    pub max_in_flight: usize,

    /// Ceiling in seconds for one poll phase
    #[serde(default)]
    pub operation_timeout: Option<u64>,

    #[serde(default)]
    pub status_source: StatusSource,

    #[serde(default)]
    pub plans: Vec<Plan>,

    pub broker_api: ApiConfig,

    pub service_instances_api: ApiConfig,

    pub bosh: ApiConfig,
}

impl IteratorConfig {
    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a config document
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.attempt_limit == 0 {
            return Err(Error::InvalidConfig(
                "attempt_limit must be at least 1".to_string(),
            ));
        }
        if self.polling_interval == 0 {
            return Err(Error::InvalidConfig(
                "polling_interval must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        match self.poll_ceiling() {
            None => {
                return Err(Error::InvalidConfig(
                    "attempt_limit × attempt_interval overflows; set operation_timeout".to_string(),
                ));
            }
            Some(ceiling) if ceiling.is_zero() => {
                return Err(Error::InvalidConfig(
                    "operation_timeout (or attempt_limit × attempt_interval) must be greater than 0"
                        .to_string(),
                ));
            }
            Some(_) => {}
        }
        if self.service_offering.is_empty() {
            return Err(Error::InvalidConfig(
                "service_offering cannot be empty".to_string(),
            ));
        }

        match (self.operation, self.errand_name.as_deref()) {
            (OperationKind::Errand, None) | (OperationKind::Errand, Some("")) => {
                return Err(Error::InvalidConfig(
                    "errand_name is required when operation is errand".to_string(),
                ));
            }
            (OperationKind::Recreate | OperationKind::Upgrade, Some(_)) => {
                return Err(Error::InvalidConfig(
                    "errand_name is only valid when operation is errand".to_string(),
                ));
            }
            _ => {}
        }

        for (name, api) in [
            ("broker_api", &self.broker_api),
            ("service_instances_api", &self.service_instances_api),
            ("bosh", &self.bosh),
        ] {
            if api.url.is_empty() {
                return Err(Error::InvalidConfig(format!("{}.url cannot be empty", name)));
            }
        }

        Ok(())
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }

    pub fn attempt_interval(&self) -> Duration {
        Duration::from_secs(self.attempt_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Ceiling for one poll phase, `attempt_limit × attempt_interval` unless set
    pub fn operation_timeout(&self) -> Duration {
        self.poll_ceiling().unwrap_or(Duration::MAX)
    }

    fn poll_ceiling(&self) -> Option<Duration> {
        match self.operation_timeout {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => self.attempt_interval().checked_mul(self.attempt_limit),
        }
    }

    /// Look up a plan by its unique ID
    pub fn plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }
}
