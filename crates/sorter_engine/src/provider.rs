use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use sorter_logging::{sorter_debug, sorter_info};
use thiserror::Error;

use crate::types::{map_reqwest_error, FailureKind};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Static description of one classification endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: String,
    /// Base URL up to the API version, e.g. `https://api.deepseek.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl ProviderConfig {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    Unknown(String),
    #[error("duplicate provider id: {0}")]
    Duplicate(String),
    #[error("provider {id} misconfigured: {reason}")]
    Misconfigured { id: String, reason: String },
    #[error("provider {id} unreachable: {status}")]
    Unreachable { id: String, status: ProbeStatus },
    #[error("no reachable provider ({tried} tried)")]
    NoneReachable { tried: usize },
}

/// Result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Reachable,
    InvalidCredential,
    RateLimited,
    HttpStatus(u16),
    Network(String),
    Misconfigured(String),
}

impl ProbeStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeStatus::Reachable)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Reachable => write!(f, "reachable"),
            ProbeStatus::InvalidCredential => write!(f, "invalid credential"),
            ProbeStatus::RateLimited => write!(f, "rate limited"),
            ProbeStatus::HttpStatus(code) => write!(f, "http status {code}"),
            ProbeStatus::Network(reason) => write!(f, "network error: {reason}"),
            ProbeStatus::Misconfigured(reason) => write!(f, "misconfigured: {reason}"),
        }
    }
}

/// A provider paired with an HTTP client carrying its credential.
///
/// Built as a unit; never mutated after construction.
#[derive(Debug, Clone)]
pub struct ActiveProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl ActiveProvider {
    pub fn connect(config: ProviderConfig) -> Result<Self, ProviderError> {
        let misconfigured = |reason: String| ProviderError::Misconfigured {
            id: config.id.clone(),
            reason,
        };

        let endpoint = reqwest::Url::parse(&config.completions_url())
            .map_err(|err| misconfigured(format!("invalid base url: {err}")))?;
        if config.api_key.trim().is_empty() {
            return Err(misconfigured("missing api key".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(misconfigured("missing model".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|_| misconfigured("api key is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|err| misconfigured(err.to_string()))?;

        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// Minimal one-token completion with a short timeout.
    pub async fn probe(&self, timeout: Duration) -> ProbeStatus {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": "ping"}],
            "max_tokens": 1,
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(timeout)
            .json(&body)
            .send()
            .await;

        let status = match response {
            Ok(response) => {
                let code = response.status().as_u16();
                if response.status().is_success() {
                    ProbeStatus::Reachable
                } else {
                    match FailureKind::from_status(code) {
                        FailureKind::InvalidCredential => ProbeStatus::InvalidCredential,
                        FailureKind::RateLimited => ProbeStatus::RateLimited,
                        _ => ProbeStatus::HttpStatus(code),
                    }
                }
            }
            Err(err) => ProbeStatus::Network(map_reqwest_error(err).to_string()),
        };
        sorter_debug!("probe provider={} status={}", self.config.id, status);
        status
    }
}

/// All configured providers, in the fixed order used for failover scans.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
    probe_timeout: Duration,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self, ProviderError> {
        for (idx, provider) in providers.iter().enumerate() {
            if providers[..idx].iter().any(|p| p.id == provider.id) {
                return Err(ProviderError::Duplicate(provider.id.clone()));
            }
        }
        Ok(Self {
            providers,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Probe a provider by id. Construction failures report as `Misconfigured`.
    pub async fn probe(&self, id: &str) -> Result<ProbeStatus, ProviderError> {
        let config = self
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::Unknown(id.to_string()))?;
        match ActiveProvider::connect(config) {
            Ok(provider) => Ok(provider.probe(self.probe_timeout).await),
            Err(err) => Ok(ProbeStatus::Misconfigured(err.to_string())),
        }
    }

    /// Probe every provider in order.
    pub async fn probe_all(&self) -> Vec<(String, ProbeStatus)> {
        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let status = match self.probe(&provider.id).await {
                Ok(status) => status,
                Err(err) => ProbeStatus::Misconfigured(err.to_string()),
            };
            sorter_info!("provider {} -> {}", provider.id, status);
            results.push((provider.id.clone(), status));
        }
        results
    }
}
