//! Configuration types for the PAPI client
//!
//! Credentials come either from a serialized config (any serde format) or
//! from `AKAMAI_*` environment variables.

use serde::{Deserialize, Serialize};

/// Section name that maps to the unprefixed `AKAMAI_*` variables
pub const DEFAULT_SECTION: &str = "default";

/// Default maximum request body size that gets signed
pub const DEFAULT_MAX_BODY: usize = 131_072;

/// Client configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API host, without scheme (e.g. `akab-xxx.luna.akamaiapis.net`)
    pub host: String,

    /// Client token
    /// ⚠️ NEVER log this value
    pub client_token: String,

    /// Client secret
    /// ⚠️ NEVER log this value
    pub client_secret: String,

    /// Access token
    /// ⚠️ NEVER log this value
    pub access_token: String,

    /// Account switch key, sent as `accountSwitchKey` on every request
    #[serde(default)]
    pub account_key: Option<String>,

    /// Largest request body the signer covers
    #[serde(default = "default_max_body")]
    pub max_body: usize,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Value of the `PAPI-Use-Prefixes` header
    #[serde(default = "default_use_prefixes")]
    pub use_prefixes: bool,
}

impl ClientConfig {
    /// Create a configuration with defaults for the optional settings
    pub fn new(
        host: impl Into<String>,
        client_token: impl Into<String>,
        client_secret: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            client_token: client_token.into(),
            client_secret: client_secret.into(),
            access_token: access_token.into(),
            account_key: None,
            max_body: default_max_body(),
            request_timeout_secs: default_request_timeout_secs(),
            use_prefixes: default_use_prefixes(),
        }
    }

    /// Set the account switch key
    pub fn with_account_key(mut self, account_key: impl Into<String>) -> Self {
        self.account_key = Some(account_key.into());
        self
    }

    /// Set the `PAPI-Use-Prefixes` flag
    pub fn with_use_prefixes(mut self, use_prefixes: bool) -> Self {
        self.use_prefixes = use_prefixes;
        self
    }

    /// Load the configuration from the process environment
    ///
    /// The default section reads `AKAMAI_HOST`, `AKAMAI_CLIENT_TOKEN`,
    /// `AKAMAI_CLIENT_SECRET` and `AKAMAI_ACCESS_TOKEN`; any other section
    /// reads `AKAMAI_{SECTION}_HOST` and so on. Optional settings are
    /// `ACCOUNT_KEY`, `MAX_BODY`, `REQUEST_TIMEOUT_SECS` and `USE_PREFIXES`
    /// under the same prefix.
    pub fn from_env(section: &str) -> Result<Self, crate::Error> {
        Self::from_lookup(section, |key| std::env::var(key).ok())
    }

    /// Load the configuration from any variable source
    pub fn from_lookup<F>(section: &str, lookup: F) -> Result<Self, crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = section.to_uppercase();
        let prefix = if section.is_empty() || section == DEFAULT_SECTION.to_uppercase() {
            "AKAMAI".to_string()
        } else {
            format!("AKAMAI_{}", section)
        };

        let required = |name: &str| {
            let key = format!("{}_{}", prefix, name);
            lookup(&key).ok_or_else(|| {
                crate::Error::config(format!("required option \"{}\" is missing from env", key))
            })
        };
        let optional = |name: &str| lookup(&format!("{}_{}", prefix, name));

        let mut config = Self::new(
            required("HOST")?,
            required("CLIENT_TOKEN")?,
            required("CLIENT_SECRET")?,
            required("ACCESS_TOKEN")?,
        );

        config.account_key = optional("ACCOUNT_KEY").filter(|key| !key.is_empty());

        // Unparseable or non-positive values fall back to the default
        if let Some(max_body) = optional("MAX_BODY").and_then(|v| v.parse::<usize>().ok()) {
            if max_body > 0 {
                config.max_body = max_body;
            }
        }

        if let Some(raw) = optional("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = raw.parse().map_err(|_| {
                crate::Error::config(format!(
                    "{}_REQUEST_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    prefix, raw
                ))
            })?;
        }

        if let Some(raw) = optional("USE_PREFIXES") {
            config.use_prefixes = raw.parse().map_err(|_| {
                crate::Error::config(format!(
                    "{}_USE_PREFIXES must be true or false, got {:?}",
                    prefix, raw
                ))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("host cannot be empty"));
        }
        if self.host.contains("://") || self.host.ends_with('/') {
            return Err(crate::Error::config(
                "host must be a bare host name, without scheme or trailing slash",
            ));
        }
        if self.client_token.is_empty() {
            return Err(crate::Error::config("client token cannot be empty"));
        }
        if self.client_secret.is_empty() {
            return Err(crate::Error::config("client secret cannot be empty"));
        }
        if self.access_token.is_empty() {
            return Err(crate::Error::config("access token cannot be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("request timeout must be > 0"));
        }
        Ok(())
    }

    /// Base URL of the API host
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("client_token", &"<REDACTED>")
            .field("client_secret", &"<REDACTED>")
            .field("access_token", &"<REDACTED>")
            .field("account_key", &self.account_key)
            .field("max_body", &self.max_body)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("use_prefixes", &self.use_prefixes)
            .finish()
    }
}

fn default_max_body() -> usize {
    DEFAULT_MAX_BODY
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_use_prefixes() -> bool {
    true
}
