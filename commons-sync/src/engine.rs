//! Wiring for a whole client session.

use std::sync::Arc;

use commons_core::{EngineConfig, ReferenceSource, SharedClock, SystemClock};
use commons_storage::{DurableStore, ExpiringCache, KeyValueMedium, SessionStore};
use commons_trust::TrustLedger;

use crate::reconcile::{Initialized, StartupReconciler};
use crate::remote::CachedRemote;
use crate::trust_service::TrustService;

/// Every component of the engine, constructed once and shared by handle.
pub struct CommonsEngine<M: KeyValueMedium> {
    config: EngineConfig,
    remote: CachedRemote,
    session: Arc<SessionStore<M>>,
    reconciler: StartupReconciler<M>,
    trust: TrustService<M>,
}

impl<M: KeyValueMedium> CommonsEngine<M> {
    pub fn new(
        config: EngineConfig,
        medium: M,
        reference: Arc<dyn ReferenceSource>,
        clock: SharedClock,
    ) -> Self {
        let cache = Arc::new(ExpiringCache::new(&config.cache, Arc::clone(&clock)));
        let remote = CachedRemote::new(cache);
        let store = DurableStore::new(medium, &config.storage, Arc::clone(&clock));
        let session = Arc::new(SessionStore::new(store, &config.storage));
        let reconciler =
            StartupReconciler::new(Arc::clone(&session), reference, Arc::clone(&clock));
        let trust = TrustService::new(
            TrustLedger::new(&config.trust, clock),
            Arc::clone(&session),
            remote.clone(),
        );
        Self {
            config,
            remote,
            session,
            reconciler,
            trust,
        }
    }

    /// Default configuration on the wall clock.
    pub fn with_defaults(medium: M, reference: Arc<dyn ReferenceSource>) -> Self {
        Self::new(EngineConfig::default(), medium, reference, SystemClock::shared())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn remote(&self) -> &CachedRemote {
        &self.remote
    }

    pub fn session(&self) -> &SessionStore<M> {
        &self.session
    }

    pub fn reconciler(&self) -> &StartupReconciler<M> {
        &self.reconciler
    }

    pub fn trust(&self) -> &TrustService<M> {
        &self.trust
    }

    pub async fn initialize(&self) -> Initialized {
        self.reconciler.initialize().await
    }

    /// Logout/reset: drop cached reads and every persisted aggregate.
    pub fn reset(&self) -> usize {
        self.remote.cache().clear();
        let removed = self.session.clear_all();
        tracing::info!(target: "commons::reconcile", removed, "session reset");
        removed
    }
}
