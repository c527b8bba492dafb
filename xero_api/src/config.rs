//! Client configuration: endpoint location and the service's request budgets.

use crate::Error;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.xero.com";

/// Versioned path of the accounting API under [`DEFAULT_BASE_URL`].
pub const DEFAULT_API_PATH: &str = "/api.xro/2.0";

/// Per-request budgets imposed by the remote service.
///
/// These describe the service, not this client, and are kept as fields so
/// they can be tuned without touching the orchestration code.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    /// Hard ceiling the service enforces on an encoded request body.
    pub max_payload_bytes: usize,
    /// Working threshold used for planning, kept below `max_payload_bytes`.
    pub payload_threshold_bytes: usize,
    /// Maximum number of records the service accepts in one request.
    pub max_elements_per_request: usize,
    /// Multiplier applied to the locally encoded size to estimate the size
    /// the service accounts for. Measured empirically; not a protocol value.
    pub size_inflation_factor: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 3_500_000,
            payload_threshold_bytes: 3_000_000,
            max_elements_per_request: 200,
            size_inflation_factor: 2.0,
        }
    }
}

impl Limits {
    /// Reads overrides from `XERO_PAYLOAD_THRESHOLD_BYTES`, `XERO_MAX_ELEMENTS`
    /// and `XERO_SIZE_INFLATION_FACTOR`, falling back to the defaults.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();
        let limits = Self {
            max_payload_bytes: defaults.max_payload_bytes,
            payload_threshold_bytes: env_usize(
                "XERO_PAYLOAD_THRESHOLD_BYTES",
                defaults.payload_threshold_bytes,
            ),
            max_elements_per_request: env_usize(
                "XERO_MAX_ELEMENTS",
                defaults.max_elements_per_request,
            ),
            size_inflation_factor: env_f64(
                "XERO_SIZE_INFLATION_FACTOR",
                defaults.size_inflation_factor,
            ),
        };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_elements_per_request == 0 {
            return Err(Error::InvalidConfig(
                "max_elements_per_request must be at least 1".to_string(),
            ));
        }
        if self.payload_threshold_bytes == 0 {
            return Err(Error::InvalidConfig(
                "payload_threshold_bytes must be positive".to_string(),
            ));
        }
        if self.payload_threshold_bytes > self.max_payload_bytes {
            return Err(Error::InvalidConfig(format!(
                "payload_threshold_bytes ({}) exceeds max_payload_bytes ({})",
                self.payload_threshold_bytes, self.max_payload_bytes
            )));
        }
        if !(self.size_inflation_factor.is_finite() && self.size_inflation_factor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "size_inflation_factor must be positive, got {}",
                self.size_inflation_factor
            )));
        }
        Ok(())
    }
}

/// Everything a [`Client`](crate::Client) needs besides its transport and codec.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_path: String,
    pub limits: Limits,
    /// When false, `summarizeErrors=false` is sent so validation failures are
    /// reported per element.
    pub summarize_errors: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            limits: Limits::default(),
            summarize_errors: false,
        }
    }
}

impl ClientConfig {
    /// Builds a config from the defaults plus `XERO_BASE_URL`,
    /// `XERO_SUMMARIZE_ERRORS` and the [`Limits::from_env`] variables.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("XERO_BASE_URL").unwrap_or(defaults.base_url),
            api_path: defaults.api_path,
            limits: Limits::from_env()?,
            summarize_errors: env_bool("XERO_SUMMARIZE_ERRORS", defaults.summarize_errors),
        })
    }

    pub fn validate(&self) -> Result<(), Error> {
        url::Url::parse(&self.base_url)?;
        self.limits.validate()
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => default,
    }
}
