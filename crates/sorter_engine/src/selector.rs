use std::sync::{Arc, RwLock};

use sorter_logging::{sorter_info, sorter_warn};

use crate::provider::{ActiveProvider, ProviderConfig, ProviderError, ProviderRegistry};

/// How the first active provider is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Try `preferred` first, then every other provider in registry order.
    Auto { preferred: Option<String> },
    /// Only this provider; selection fails if it is unreachable.
    Fixed(String),
}

/// Owns the single live [`ActiveProvider`] and replaces it atomically.
///
/// Readers take an `Arc` snapshot; a switch swaps the pointer only after the
/// replacement has been built and probed, so a failed switch leaves the
/// previous provider in place.
#[derive(Debug)]
pub struct ProviderSelector {
    registry: ProviderRegistry,
    active: RwLock<Option<Arc<ActiveProvider>>>,
    switching: tokio::sync::Mutex<()>,
}

impl ProviderSelector {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            active: RwLock::new(None),
            switching: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Snapshot of the current provider, if one has been selected.
    pub fn active(&self) -> Option<Arc<ActiveProvider>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn active_id(&self) -> Option<String> {
        self.active().map(|p| p.id().to_string())
    }

    /// Choose and activate a provider according to `policy`.
    pub async fn select_best(&self, policy: &SelectionPolicy) -> Result<ProviderConfig, ProviderError> {
        let _guard = self.switching.lock().await;
        let order: Vec<&ProviderConfig> = match policy {
            SelectionPolicy::Fixed(id) => {
                let config = self
                    .registry
                    .get(id)
                    .ok_or_else(|| ProviderError::Unknown(id.clone()))?;
                vec![config]
            }
            SelectionPolicy::Auto { preferred } => {
                let mut order = Vec::with_capacity(self.registry.len());
                if let Some(preferred) = preferred {
                    match self.registry.get(preferred) {
                        Some(config) => order.push(config),
                        None => sorter_warn!("preferred provider {} is not configured", preferred),
                    }
                }
                order.extend(
                    self.registry
                        .iter()
                        .filter(|c| Some(&c.id) != preferred.as_ref()),
                );
                order
            }
        };

        let tried = order.len();
        let mut last_failure = None;
        for config in order {
            match self.try_build(config.clone()).await {
                Ok(provider) => {
                    sorter_info!("selected provider {} (model {})", provider.id(), provider.model());
                    let selected = provider.config().clone();
                    self.install(provider);
                    return Ok(selected);
                }
                Err(err) => {
                    sorter_warn!("provider {} not selectable: {}", config.id, err);
                    last_failure = Some(err);
                }
            }
        }

        match (policy, last_failure) {
            (SelectionPolicy::Fixed(_), Some(err)) => Err(err),
            _ => Err(ProviderError::NoneReachable { tried }),
        }
    }

    /// Transactionally replace the active provider with `id`.
    ///
    /// On any failure the previous provider stays active and untouched.
    pub async fn switch_to(&self, id: &str) -> Result<ProviderConfig, ProviderError> {
        let _guard = self.switching.lock().await;
        let config = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::Unknown(id.to_string()))?;

        match self.try_build(config).await {
            Ok(provider) => {
                let previous = self.active_id();
                let selected = provider.config().clone();
                self.install(provider);
                sorter_info!(
                    "switched provider {} -> {}",
                    previous.as_deref().unwrap_or("<none>"),
                    selected.id
                );
                Ok(selected)
            }
            Err(err) => {
                sorter_warn!(
                    "switch to {} failed, keeping {}: {}",
                    id,
                    self.active_id().as_deref().unwrap_or("<none>"),
                    err
                );
                Err(err)
            }
        }
    }

    async fn try_build(&self, config: ProviderConfig) -> Result<ActiveProvider, ProviderError> {
        let provider = ActiveProvider::connect(config)?;
        let status = provider.probe(self.registry.probe_timeout()).await;
        if status.is_reachable() {
            Ok(provider)
        } else {
            Err(ProviderError::Unreachable {
                id: provider.id().to_string(),
                status,
            })
        }
    }

    fn install(&self, provider: ActiveProvider) {
        let mut slot = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(provider));
    }
}
