//! Cached license gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{License, LicenseError, LicenseExtractor};

#[derive(Debug)]
enum GateState {
    /// Nothing extracted yet.
    Unloaded,
    Active(Arc<License>),
    /// Last extraction failed; cleared by refresh.
    Unavailable,
    /// Cleared by refresh only.
    Revoked,
}

/// Answers whether a usable license exists.
///
/// The gate never looks at command text.
pub struct LicenseGate {
    extractor: Arc<dyn LicenseExtractor>,
    application_id: String,
    state: RwLock<GateState>,
    /// Serializes extraction so concurrent first calls extract once
    extracting: tokio::sync::Mutex<()>,
    /// Bumped by every revoke, under the state write lock
    revocations: AtomicU64,
}

impl LicenseGate {
    pub fn new(extractor: Arc<dyn LicenseExtractor>, application_id: impl Into<String>) -> Self {
        Self {
            extractor,
            application_id: application_id.into(),
            state: RwLock::new(GateState::Unloaded),
            extracting: tokio::sync::Mutex::new(()),
            revocations: AtomicU64::new(0),
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// The cached license, extracting on first use.
    ///
    /// Expired or foreign licenses count as absent.
    pub async fn current_license(&self) -> Option<Arc<License>> {
        if let Some(cached) = self.cached() {
            return cached;
        }

        let _guard = self.extracting.lock().await;
        // Another caller may have finished extraction while we waited
        if let Some(cached) = self.cached() {
            return cached;
        }
        self.load().await.ok()
    }

    /// `Some(answer)` unless extraction is still needed.
    fn cached(&self) -> Option<Option<Arc<License>>> {
        match &*self.state.read() {
            GateState::Unloaded => None,
            GateState::Active(license) => {
                if license.is_expired_at(Utc::now()) {
                    debug!(tenant = %license.tenant, "cached license has expired");
                    Some(None)
                } else {
                    Some(Some(Arc::clone(license)))
                }
            }
            GateState::Unavailable | GateState::Revoked => Some(None),
        }
    }

    async fn load(&self) -> Result<Arc<License>, LicenseError> {
        let generation = self.revocations.load(Ordering::SeqCst);
        let result = self
            .extractor
            .extract()
            .await
            .and_then(|license| license.verify(&self.application_id, Utc::now()).map(|_| license));

        let mut state = self.state.write();
        // A revoke issued while extracting wins over its result
        if self.revocations.load(Ordering::SeqCst) != generation {
            debug!("license revoked during extraction, discarding result");
            return Err(LicenseError::Revoked);
        }

        match result {
            Ok(license) => {
                let license = Arc::new(license);
                info!(
                    source = %self.extractor.describe(),
                    tenant = %license.tenant,
                    plan = %license.plan,
                    "license loaded"
                );
                *state = GateState::Active(Arc::clone(&license));
                Ok(license)
            }
            Err(e) => {
                warn!(source = %self.extractor.describe(), error = %e, "license unavailable");
                *state = GateState::Unavailable;
                Err(e)
            }
        }
    }

    /// Re-extract and swap the cached license.
    pub async fn refresh(&self) -> Result<Arc<License>, LicenseError> {
        let _guard = self.extracting.lock().await;
        self.load().await
    }

    /// Drop the cached license until the next successful [`refresh`](Self::refresh).
    ///
    /// An extraction already in flight cannot reinstate the license.
    pub fn revoke(&self) {
        let mut state = self.state.write();
        self.revocations.fetch_add(1, Ordering::SeqCst);
        *state = GateState::Revoked;
        info!("license revoked");
    }

    pub fn is_revoked(&self) -> bool {
        matches!(*self.state.read(), GateState::Revoked)
    }

    /// Refresh every `period` until `shutdown` fires.
    ///
    /// A revoked gate stays revoked.
    pub fn spawn_revalidation(
        self: &Arc<Self>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if gate.is_revoked() {
                            continue;
                        }
                        if let Err(e) = gate.refresh().await {
                            debug!(error = %e, "license revalidation failed");
                        }
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for LicenseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseGate")
            .field("source", &self.extractor.describe())
            .field("application_id", &self.application_id)
            .field("state", &*self.state.read())
            .finish()
    }
}
