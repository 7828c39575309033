use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::{SettingsCallback, SubscriberRegistry, SubscriptionId};
use super::{Settings, SettingsError, SettingsPatch};
use crate::config::SettingsConfig;
use crate::roster::domain::UserId;
use crate::roster::repository::{AuthGateway, SettingsRepository};

/// Result of one debounced write, delivered to every caller folded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Settings),
    Failed(SettingsError),
    /// The queued write was dropped by sign-out or runtime shutdown.
    Cancelled,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// Resolves once the write that absorbed an `update` call has finished.
#[derive(Debug)]
pub struct SaveTicket {
    receiver: oneshot::Receiver<SaveOutcome>,
}

impl SaveTicket {
    pub async fn wait(self) -> SaveOutcome {
        self.receiver.await.unwrap_or(SaveOutcome::Cancelled)
    }
}

/// Settings cache for the signed-in operator with debounced persistence.
///
/// One instance is owned by the composition root and handed out by clone.
/// Updates arriving within the debounce window are folded into a single
/// write; the cache and subscribers only see a burst after the backend has
/// accepted it. `update` and `reset` spawn onto the current Tokio runtime.
#[derive(Clone)]
pub struct SettingsStore {
    shared: Arc<Shared>,
}

struct Shared {
    repository: Arc<dyn SettingsRepository>,
    auth: Arc<dyn AuthGateway>,
    delay: Duration,
    state: Mutex<StoreState>,
    // Held across the backend call so writes reach the backend one at a time.
    write_lock: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct StoreState {
    current: Settings,
    loaded: bool,
    pending: Option<PendingWrite>,
    generation: u64,
    // Bumped on sign-out so a write finishing afterwards leaves the cache alone.
    session: u64,
    subscribers: SubscriberRegistry,
}

struct PendingWrite {
    generation: u64,
    patch: SettingsPatch,
    waiters: Vec<oneshot::Sender<SaveOutcome>>,
    timer: JoinHandle<()>,
}

impl SettingsStore {
    pub fn new(
        repository: Arc<dyn SettingsRepository>,
        auth: Arc<dyn AuthGateway>,
        config: &SettingsConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                repository,
                auth,
                delay: config.persist_debounce,
                state: Mutex::new(StoreState::default()),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Loads the operator's row once per session; later calls return the cache.
    pub async fn load(&self) -> Result<Settings, SettingsError> {
        {
            let state = self.shared.lock();
            if state.loaded {
                return Ok(state.current.clone());
            }
        }

        let user_id = self.shared.require_user().await?;
        let settings = match self.shared.repository.load(&user_id).await {
            Ok(stored) => stored.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, %user_id, "failed to load settings");
                return Err(err.into());
            }
        };

        let callbacks = {
            let mut state = self.shared.lock();
            state.current = settings.clone();
            state.loaded = true;
            state.subscribers.snapshot()
        };
        notify(&callbacks, &settings);
        debug!(%user_id, "settings loaded");
        Ok(settings)
    }

    /// Copy of the cached settings.
    pub fn current(&self) -> Settings {
        self.shared.lock().current.clone()
    }

    /// Queues `patch` and (re)starts the debounce timer.
    pub fn update(&self, patch: SettingsPatch) -> Result<SaveTicket, SettingsError> {
        patch.validate()?;
        let (sender, receiver) = oneshot::channel();

        let mut state = self.shared.lock();
        let (folded, mut waiters) = match state.pending.take() {
            Some(pending) => {
                pending.timer.abort();
                (pending.patch.merge(patch), pending.waiters)
            }
            None => (patch, Vec::new()),
        };
        waiters.push(sender);

        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::clone(&self.shared);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(shared.delay).await;
            shared.flush(generation).await;
        });

        state.pending = Some(PendingWrite {
            generation,
            patch: folded,
            waiters,
            timer,
        });

        Ok(SaveTicket { receiver })
    }

    /// Restores the defaults through the same debounced path.
    pub fn reset(&self) -> Result<SaveTicket, SettingsError> {
        self.update(SettingsPatch::from(Settings::default()))
    }

    /// Drops the cached row and any queued write after sign-out.
    ///
    /// Callers still waiting on a queued write receive `Cancelled`;
    /// subscribers are shown the defaults.
    pub fn end_session(&self) {
        let defaults = Settings::default();
        let callbacks = {
            let mut state = self.shared.lock();
            if let Some(pending) = state.pending.take() {
                pending.timer.abort();
            }
            state.current = defaults.clone();
            state.loaded = false;
            state.session += 1;
            state.subscribers.snapshot()
        };
        notify(&callbacks, &defaults);
        debug!("settings session ended");
    }

    /// Registers `callback`, calling it right away with the current settings.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Settings) + Send + Sync + 'static,
    {
        let callback: SettingsCallback = Arc::new(callback);
        let (id, current) = {
            let mut state = self.shared.lock();
            let id = state.subscribers.insert(Arc::clone(&callback));
            (id, state.current.clone())
        };
        callback(&current);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.lock().subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("settings state mutex poisoned")
    }

    async fn require_user(&self) -> Result<UserId, SettingsError> {
        self.auth
            .current_user()
            .await?
            .ok_or(SettingsError::Unauthenticated)
    }

    async fn flush(&self, generation: u64) {
        let _writer = self.write_lock.lock().await;

        let (patch, waiters) = {
            let mut state = self.lock();
            match state.pending.take() {
                Some(pending) if pending.generation == generation => {
                    (pending.patch, pending.waiters)
                }
                other => {
                    // Superseded while waiting for the writer slot.
                    state.pending = other;
                    return;
                }
            }
        };

        let outcome = self.persist(patch).await;
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Fetches the stored row when nothing was loaded this session, so a patch
    /// queued before `load` is merged over it rather than over the defaults.
    async fn ensure_loaded(&self, user_id: &UserId) -> Result<(), SettingsError> {
        let session = {
            let state = self.lock();
            if state.loaded {
                return Ok(());
            }
            state.session
        };

        let stored = match self.repository.load(user_id).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, %user_id, "failed to load settings before saving");
                return Err(err.into());
            }
        };

        let mut state = self.lock();
        if !state.loaded && state.session == session {
            state.current = stored.unwrap_or_default();
            state.loaded = true;
            debug!(%user_id, "settings loaded ahead of a queued write");
        }
        Ok(())
    }

    async fn persist(&self, patch: SettingsPatch) -> SaveOutcome {
        let user_id = match self.require_user().await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = %err, "settings write skipped");
                return SaveOutcome::Failed(err);
            }
        };

        if let Err(err) = self.ensure_loaded(&user_id).await {
            return SaveOutcome::Failed(err);
        }

        let (merged, session) = {
            let state = self.lock();
            (patch.apply_to(&state.current), state.session)
        };

        if let Err(err) = self.repository.upsert(&user_id, &merged).await {
            warn!(error = %err, %user_id, "failed to save settings");
            return SaveOutcome::Failed(err.into());
        }

        let callbacks = {
            let mut state = self.lock();
            if state.session != session {
                debug!(%user_id, "settings saved after sign-out; cache left untouched");
                return SaveOutcome::Saved(merged);
            }
            state.current = merged.clone();
            state.subscribers.snapshot()
        };
        notify(&callbacks, &merged);
        info!(%user_id, "settings saved");
        SaveOutcome::Saved(merged)
    }
}

fn notify(callbacks: &[SettingsCallback], settings: &Settings) {
    for callback in callbacks {
        callback(settings);
    }
}
