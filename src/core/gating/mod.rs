// src/core/gating/mod.rs
//! Cooldown locks that run a side effect at most once per window for each
//! `(effect, identity, source)` triple.

pub mod effects;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::KvCache;
use crate::utils::error::Result;

pub use effects::SideEffects;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    ActivityLog,
    Alert,
    Augment,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::ActivityLog => "log",
            EffectKind::Alert => "alert",
            EffectKind::Augment => "augment",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The effect ran and the lock is held for the cooldown.
    Executed,
    /// A live lock suppressed the effect.
    Suppressed,
    /// The effect ran and failed; no lock is held.
    Failed,
    /// The lock store was unreachable, so the effect was not attempted.
    Skipped,
}

pub fn lock_key(kind: EffectKind, identity: &str, source: &str) -> String {
    format!("cooldown:{}:{}:{}", kind, identity, source)
}

pub struct Gate {
    cache: Arc<dyn KvCache>,
    atomic: bool,
}

impl Gate {
    pub fn new(cache: Arc<dyn KvCache>, atomic: bool) -> Self {
        Self { cache, atomic }
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub async fn try_run<F, Fut>(
        &self,
        kind: EffectKind,
        identity: &str,
        source: &str,
        ttl: Duration,
        effect: F,
    ) -> GateOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let key = lock_key(kind, identity, source);
        if self.atomic {
            self.reserve_then_run(&key, ttl, effect).await
        } else {
            self.check_then_run(&key, ttl, effect).await
        }
    }

    async fn check_then_run<F, Fut>(&self, key: &str, ttl: Duration, effect: F) -> GateOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match self.cache.exists(key).await {
            Ok(true) => return GateOutcome::Suppressed,
            Ok(false) => {}
            Err(e) => {
                debug!("Lock lookup for {} failed, skipping effect: {}", key, e);
                return GateOutcome::Skipped;
            }
        }

        if let Err(e) = effect().await {
            warn!("Gated effect {} failed: {}", key, e);
            return GateOutcome::Failed;
        }

        if let Err(e) = self.cache.set(key, b"1".to_vec(), ttl).await {
            debug!("Could not set lock {}: {}", key, e);
        }
        GateOutcome::Executed
    }

    async fn reserve_then_run<F, Fut>(&self, key: &str, ttl: Duration, effect: F) -> GateOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match self.cache.set_nx(key, b"1".to_vec(), ttl).await {
            Ok(true) => {}
            Ok(false) => return GateOutcome::Suppressed,
            Err(e) => {
                debug!("Lock reservation for {} failed, skipping effect: {}", key, e);
                return GateOutcome::Skipped;
            }
        }

        match effect().await {
            Ok(()) => GateOutcome::Executed,
            Err(e) => {
                warn!("Gated effect {} failed: {}", key, e);
                if let Err(e) = self.cache.delete(key).await {
                    debug!("Could not release lock {}: {}", key, e);
                }
                GateOutcome::Failed
            }
        }
    }
}
