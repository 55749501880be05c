//! Process startup sequencing
//!
//! `StartupCoordinator` runs, in order:
//! 1. Database readiness (later steps may read persisted settings)
//! 2. A short settle delay
//! 3. A refresh of the Bluetooth / permission snapshot
//! 4. A bounded auto-reconnect to the last paired glasses
//!
//! A failed auto-reconnect still ends in `Ready`; only a database failure or
//! a crash inside the sequence ends in `Failed`.

mod retry;

pub use retry::{AttemptFailure, RetryOutcome, RetryPolicy};

use crate::error::{JarvisError, Result};
use crate::glasses::GlassesConnectionManager;
use crate::messages::DatabaseInitializer;
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitializationState {
    #[default]
    NotStarted,
    InitializingDatabase,
    InitializingServices,
    Ready,
    Failed(String),
}

/// Timing knobs of the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupOptions {
    /// Wait between database readiness and the Bluetooth refresh
    pub settle_delay: Duration,
    /// Auto-reconnect policy
    pub reconnect: RetryPolicy,
    /// Readiness polling interval of `wait_for_initialization`
    pub poll_interval: Duration,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            reconnect: RetryPolicy::default(),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Sequences storage readiness and glasses auto-reconnect at startup
pub struct StartupCoordinator {
    core: Arc<CoordinatorCore>,
    run: Mutex<Option<RunTask>>,
}

struct CoordinatorCore {
    database: Arc<dyn DatabaseInitializer>,
    glasses: Arc<dyn GlassesConnectionManager>,
    options: StartupOptions,
    state: watch::Sender<InitializationState>,
    ready: watch::Sender<bool>,
    reconnect_outcome: StdMutex<Option<RetryOutcome>>,
}

struct RunTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StartupCoordinator {
    pub fn new(
        database: Arc<dyn DatabaseInitializer>,
        glasses: Arc<dyn GlassesConnectionManager>,
        options: StartupOptions,
    ) -> Self {
        let (state, _) = watch::channel(InitializationState::NotStarted);
        let (ready, _) = watch::channel(false);
        Self {
            core: Arc::new(CoordinatorCore {
                database,
                glasses,
                options,
                state,
                ready,
                reconnect_outcome: StdMutex::new(None),
            }),
            run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> watch::Receiver<InitializationState> {
        self.core.state.subscribe()
    }

    pub fn ready(&self) -> watch::Receiver<bool> {
        self.core.ready.subscribe()
    }

    pub fn current_state(&self) -> InitializationState {
        self.core.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.core.ready.borrow()
    }

    /// Result of the last auto-reconnect, once the sequence got that far
    pub fn last_reconnect_outcome(&self) -> Option<RetryOutcome> {
        self.core
            .reconnect_outcome
            .lock()
            .ok()
            .and_then(|outcome| outcome.clone())
    }

    /// Start the startup sequence, cancelling any run still in progress
    pub async fn initialize(&self) {
        let mut run = self.run.lock().await;

        if let Some(previous) = run.take() {
            info!("Restarting initialization, cancelling previous run");
            previous.cancel.cancel();
            if let Err(e) = previous.handle.await {
                if e.is_panic() {
                    error!("Previous initialization run panicked: {}", e);
                }
            }
        }

        self.core.ready.send_replace(false);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_initialization(Arc::clone(&self.core), cancel.clone()));
        *run = Some(RunTask { cancel, handle });
    }

    /// Wait until ready or until `timeout` elapses. Never fails.
    pub async fn wait_for_initialization(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("Initialization not ready within {:?}", timeout);
                return false;
            }
            tokio::time::sleep(self.core.options.poll_interval.min(deadline - now)).await;
        }
    }
}

impl Drop for StartupCoordinator {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().as_ref() {
            run.cancel.cancel();
        }
    }
}

async fn run_initialization(core: Arc<CoordinatorCore>, cancel: CancellationToken) {
    info!("Starting initialization");

    // Run the sequence in its own task so a crash lands in `Failed`
    let mut sequence = tokio::spawn(run_sequence(Arc::clone(&core)));

    let joined = tokio::select! {
        _ = cancel.cancelled() => {
            sequence.abort();
            debug!("Initialization run cancelled");
            return;
        }
        joined = &mut sequence => joined,
    };

    let result = joined.unwrap_or_else(|e| {
        Err(JarvisError::Initialization(format!("startup sequence crashed: {}", e)))
    });

    match result {
        Ok(()) => {
            core.state.send_replace(InitializationState::Ready);
            core.ready.send_replace(true);
            info!("Initialization complete");
        }
        Err(e) => {
            error!("Initialization failed: {}", e);
            core.state
                .send_replace(InitializationState::Failed(e.message().to_string()));
        }
    }
}

async fn run_sequence(core: Arc<CoordinatorCore>) -> Result<()> {
    core.state.send_replace(InitializationState::InitializingDatabase);
    core.database
        .initialize_if_needed()
        .await
        .map_err(|e| JarvisError::Initialization(format!("database: {}", e.message())))?;
    info!("Database ready");

    core.state.send_replace(InitializationState::InitializingServices);
    tokio::time::sleep(core.options.settle_delay).await;

    core.glasses.update_bluetooth_state().await;

    let outcome = auto_reconnect(&core).await;
    match &outcome {
        RetryOutcome::Succeeded { attempt } => {
            info!("Glasses auto-reconnect succeeded on attempt {}", attempt)
        }
        RetryOutcome::Exhausted { attempts, last_error } => warn!(
            "Glasses auto-reconnect gave up after {} attempts (last error: {:?})",
            attempts, last_error
        ),
    }
    if let Ok(mut slot) = core.reconnect_outcome.lock() {
        *slot = Some(outcome);
    }

    Ok(())
}

async fn auto_reconnect(core: &CoordinatorCore) -> RetryOutcome {
    let glasses = &core.glasses;

    core.options
        .reconnect
        .run(
            || {
                let permissions = glasses.has_permissions();
                let bluetooth = glasses.is_bluetooth_enabled();
                let device = glasses.has_persisted_device();
                if !(permissions && bluetooth && device) {
                    debug!(
                        "Auto-reconnect preconditions: permissions={}, bluetooth={}, paired device={}",
                        permissions, bluetooth, device
                    );
                }
                permissions && bluetooth && device
            },
            |attempt| {
                info!("Auto-reconnecting glasses (attempt {})", attempt);
                glasses.ensure_auto_reconnect()
            },
        )
        .await
}
