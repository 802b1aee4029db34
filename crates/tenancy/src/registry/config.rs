//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tenant::DecryptionPolicy;

/// Configuration for the connection and model registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// A connection unused for this long is closed by the next sweep.
    #[serde(with = "humantime_serde", default = "default_idle_ttl")]
    pub idle_ttl: Duration,

    /// How often the background sweeper looks for idle connections.
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,

    /// Upper bound on a single connection attempt.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// How long a caller waits for an in-flight attempt before giving up.
    ///
    /// Giving up does not cancel the attempt itself.
    #[serde(with = "humantime_serde::option", default)]
    pub acquire_timeout: Option<Duration>,

    /// Application name reported to the database server.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// What to do when a stored secret cannot be decrypted.
    #[serde(default)]
    pub decryption_policy: DecryptionPolicy,
}

fn default_idle_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_app_name() -> String {
    "empresa".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_ttl: default_idle_ttl(),
            sweep_interval: default_sweep_interval(),
            connect_timeout: default_connect_timeout(),
            acquire_timeout: None,
            app_name: default_app_name(),
            decryption_policy: DecryptionPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle TTL.
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Sets the application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets the decryption policy.
    pub fn with_decryption_policy(mut self, policy: DecryptionPolicy) -> Self {
        self.decryption_policy = policy;
        self
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
