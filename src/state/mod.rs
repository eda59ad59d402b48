//! Core game state: the record model, the command handlers, the scoring
//! policy, and the shared application state handle.

pub mod machine;
pub mod record;
pub mod scoring;

use std::{sync::Arc, time::Duration};

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::record_store::RecordStore,
    error::ServiceError,
    oracle::{QuestionOracle, ServedQuestions, bank::BankOracle},
    state::scoring::ScoringTable,
};

/// Cheaply cloneable handle on the shared application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the installed record store, the question
/// oracle pair (primary plus bank fallback), and per-game side tables.
pub struct AppState {
    record_store: RwLock<Option<Arc<dyn RecordStore>>>,
    degraded: watch::Sender<bool>,
    oracle: Arc<dyn QuestionOracle>,
    bank: Arc<BankOracle>,
    served: ServedQuestions,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a record store is
    /// installed. When no primary oracle is supplied the bank serves double
    /// duty as the primary.
    pub fn new(config: AppConfig, oracle: Option<Arc<dyn QuestionOracle>>) -> SharedState {
        let bank = Arc::new(BankOracle::new(config.questions.clone()));
        let oracle: Arc<dyn QuestionOracle> = match oracle {
            Some(primary) => primary,
            None => bank.clone(),
        };
        let (degraded_tx, _rx) = watch::channel(true);

        Arc::new(Self {
            record_store: RwLock::new(None),
            degraded: degraded_tx,
            oracle,
            bank,
            served: ServedQuestions::new(),
            config,
        })
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn record_store(&self) -> Option<Arc<dyn RecordStore>> {
        let guard = self.record_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the record store or fail with a degraded-mode error.
    pub async fn require_record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        self.record_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a record store implementation and leave degraded mode.
    pub async fn install_record_store(&self, store: Arc<dyn RecordStore>) {
        {
            let mut guard = self.record_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current record store and enter degraded mode.
    pub async fn clear_record_store(&self) {
        {
            let mut guard = self.record_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Flip the degraded flag, notifying watchers only on a change.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// The primary question oracle.
    pub fn oracle(&self) -> Arc<dyn QuestionOracle> {
        Arc::clone(&self.oracle)
    }

    /// The static bank used as the generation fallback.
    pub fn fallback_bank(&self) -> Arc<BankOracle> {
        Arc::clone(&self.bank)
    }

    /// Per-game anti-repeat question tracking.
    pub fn served_questions(&self) -> &ServedQuestions {
        &self.served
    }

    /// The configured scoring table.
    pub fn scoring(&self) -> &ScoringTable {
        &self.config.scoring
    }

    /// Deadline applied to question generation calls.
    pub fn oracle_timeout(&self) -> Duration {
        self.config.oracle_timeout
    }
}
