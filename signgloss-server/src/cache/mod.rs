//! Self-healing catalog cache
//!
//! Holds the current catalog snapshot, the previous good snapshot, the time of
//! the last successful refresh and a consecutive error counter.
//!
//! **Refresh policy:** a refresh is due when the cache was never loaded, or
//! when the time since the last successful refresh exceeds
//! `base_interval * (1 + consecutive_errors)`. A failing store is therefore
//! retried less and less often instead of on every request.
//!
//! **Failure handling:** a load that errors, times out, or returns fewer than
//! `min_items` entries is a failed attempt. The current snapshot is left in
//! place and served as long as `consecutive_errors <= max_errors`. Past that
//! budget (or with nothing loaded yet) every caller gets
//! [`CacheError::Unavailable`] until a later refresh succeeds; the snapshot is
//! still retained for diagnostics.
//!
//! **Concurrency:** refreshes are serialized by a single-flight gate. Callers
//! that queued behind an attempt reuse its outcome instead of loading again.
//! Snapshots are swapped as whole `Arc`s so readers never see a partial one.

mod snapshot;

pub use snapshot::CatalogSnapshot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use signgloss_common::config::CacheConfig;
use signgloss_common::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::clients::UpstreamError;
use crate::types::GlossKey;

/// Bulk source of catalog entries
#[async_trait]
pub trait CatalogSource<T>: Send + Sync {
    /// Enumerate the full backing collection
    async fn load(&self) -> Result<BTreeMap<GlossKey, T>, UpstreamError>;
}

/// Why a refresh attempt was rejected
#[derive(Debug, Error)]
pub enum RefreshFailure {
    #[error("source error: {0}")]
    Source(#[from] UpstreamError),

    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    #[error("suspiciously small catalog: {count} items (minimum {min})")]
    BelowThreshold { count: usize, min: usize },
}

/// Cache errors surfaced to callers
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("catalog '{catalog}' unavailable after {consecutive_errors} failed refresh(es): {reason}")]
    Unavailable {
        catalog: String,
        consecutive_errors: u32,
        reason: String,
    },
}

/// Staleness and sanity policy
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub base_interval: chrono::Duration,
    pub min_items: usize,
    pub max_errors: u32,
    pub load_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for RefreshPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            base_interval: config.refresh_interval(),
            min_items: config.min_items,
            max_errors: config.max_errors,
            load_timeout: config.load_timeout(),
        }
    }
}

impl RefreshPolicy {
    /// Whether a refresh is due at `now`
    pub fn is_stale(
        &self,
        last_refresh_at: Option<DateTime<Utc>>,
        consecutive_errors: u32,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last) = last_refresh_at else {
            return true;
        };
        let elapsed_ms = now.signed_duration_since(last).num_milliseconds();
        let factor = i64::from(consecutive_errors) + 1;
        let allowed_ms = self.base_interval.num_milliseconds().saturating_mul(factor);
        elapsed_ms > allowed_ms
    }
}

/// Point-in-time view of a cache for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub catalog: String,
    pub loaded: bool,
    pub item_count: usize,
    pub previous_item_count: Option<usize>,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub consecutive_errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

struct CacheState<T> {
    current: Option<Arc<CatalogSnapshot<T>>>,
    previous: Option<Arc<CatalogSnapshot<T>>>,
    last_refresh_at: Option<DateTime<Utc>>,
    consecutive_errors: u32,
    last_failure: Option<String>,
    /// Completed refresh attempts, success or failure
    attempts: u64,
}

impl<T> CacheState<T> {
    fn empty() -> Self {
        Self {
            current: None,
            previous: None,
            last_refresh_at: None,
            consecutive_errors: 0,
            last_failure: None,
            attempts: 0,
        }
    }

    fn last_good(&self) -> Option<Arc<CatalogSnapshot<T>>> {
        self.current.clone().or_else(|| self.previous.clone())
    }
}

/// Self-healing cache over one catalog collection
pub struct SelfHealingCache<T> {
    name: String,
    source: Arc<dyn CatalogSource<T>>,
    policy: RefreshPolicy,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState<T>>,
    refresh_gate: Mutex<()>,
}

impl<T: Send + Sync + 'static> SelfHealingCache<T> {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn CatalogSource<T>>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            policy,
            clock: Arc::new(SystemClock),
            state: RwLock::new(CacheState::empty()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Replace the wall clock used for staleness decisions
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot, refreshing first when the policy says so
    pub async fn all(&self) -> Result<Arc<CatalogSnapshot<T>>, CacheError> {
        let started = Instant::now();
        let result = self.snapshot().await;
        debug!(
            catalog = %self.name,
            "Cache access completed in {:.3} seconds",
            started.elapsed().as_secs_f64()
        );
        result
    }

    /// Look up one key
    pub async fn get(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: Clone,
    {
        Ok(self.all().await?.get(key).cloned())
    }

    /// Force the initial load; returns the number of entries served
    pub async fn warm(&self) -> Result<usize, CacheError> {
        Ok(self.all().await?.len())
    }

    pub async fn status(&self) -> CacheStatus {
        let state = self.state.read().await;
        CacheStatus {
            catalog: self.name.clone(),
            loaded: state.current.is_some(),
            item_count: state.current.as_ref().map_or(0, |s| s.len()),
            previous_item_count: state.previous.as_ref().map(|s| s.len()),
            last_refresh_at: state.last_refresh_at,
            consecutive_errors: state.consecutive_errors,
            last_failure: state.last_failure.clone(),
        }
    }

    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot<T>>, CacheError> {
        let observed_attempts = {
            let state = self.state.read().await;
            if state.current.is_some() && !self.is_stale(&state) {
                return self.serve_or_fail(&state);
            }
            state.attempts
        };

        let _gate = self.refresh_gate.lock().await;

        {
            let state = self.state.read().await;
            if state.attempts != observed_attempts {
                // Another caller ran an attempt while we queued; share its outcome
                return self.serve_or_fail(&state);
            }
            if state.current.is_some() && !self.is_stale(&state) {
                return self.serve_or_fail(&state);
            }
        }

        self.refresh().await
    }

    fn is_stale(&self, state: &CacheState<T>) -> bool {
        self.policy.is_stale(
            state.last_refresh_at,
            state.consecutive_errors,
            self.clock.now(),
        )
    }

    /// Run one refresh attempt. Caller must hold the refresh gate.
    async fn refresh(&self) -> Result<Arc<CatalogSnapshot<T>>, CacheError> {
        info!(catalog = %self.name, "Refreshing catalog");

        let outcome = match tokio::time::timeout(self.policy.load_timeout, self.source.load()).await
        {
            Err(_) => Err(RefreshFailure::Timeout(self.policy.load_timeout)),
            Ok(Err(e)) => Err(RefreshFailure::Source(e)),
            Ok(Ok(entries)) if entries.len() < self.policy.min_items => {
                Err(RefreshFailure::BelowThreshold {
                    count: entries.len(),
                    min: self.policy.min_items,
                })
            }
            Ok(Ok(entries)) => Ok(entries),
        };

        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.attempts += 1;

        match outcome {
            Ok(entries) => {
                let snapshot = Arc::new(CatalogSnapshot::new(entries, now));
                state.previous = state.current.replace(Arc::clone(&snapshot));
                state.last_refresh_at = Some(now);
                state.consecutive_errors = 0;
                state.last_failure = None;
                info!(
                    catalog = %self.name,
                    "Cache successfully loaded with {} entries",
                    snapshot.len()
                );
                Ok(snapshot)
            }
            Err(failure) => {
                state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                state.last_failure = Some(failure.to_string());
                error!(
                    catalog = %self.name,
                    "Error loading cache (attempt {}): {}",
                    state.consecutive_errors,
                    failure
                );
                self.serve_or_fail(&state)
            }
        }
    }

    /// Serve the last good snapshot while the error budget allows it
    fn serve_or_fail(&self, state: &CacheState<T>) -> Result<Arc<CatalogSnapshot<T>>, CacheError> {
        if state.consecutive_errors <= self.policy.max_errors {
            if let Some(snapshot) = state.last_good() {
                if state.consecutive_errors > 0 {
                    warn!(
                        catalog = %self.name,
                        "Using last good snapshot ({} entries, {} consecutive errors)",
                        snapshot.len(),
                        state.consecutive_errors
                    );
                }
                return Ok(snapshot);
            }
        }

        Err(CacheError::Unavailable {
            catalog: self.name.clone(),
            consecutive_errors: state.consecutive_errors,
            reason: state
                .last_failure
                .clone()
                .unwrap_or_else(|| "no snapshot loaded".to_string()),
        })
    }
}
