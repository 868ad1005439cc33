//! Process-wide handle to a lazily launched rendering engine.
//!
//! The first caller launches the engine; concurrent callers wait on the same
//! lock and then reuse the instance that launch produced. A disconnected
//! instance is replaced by the next caller. A failed launch is remembered for
//! a short cool-down so a batch of files does not retry it once per file.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// How long a failed launch is reported without trying again.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// A running engine instance.
pub trait Engine: Send + Sync + 'static {
    /// False once the underlying process or connection is gone.
    fn is_connected(&self) -> bool;
}

/// Starts engine instances.
#[async_trait]
pub trait EngineLauncher: Send + Sync + 'static {
    type Engine: Engine;

    async fn launch(&self) -> Result<Self::Engine>;
}

enum Slot<E> {
    Empty,
    Running(Arc<E>),
    Failed { at: Instant, reason: String },
}

/// Single-flight, self-healing engine handle.
pub struct SharedEngine<L: EngineLauncher> {
    launcher: L,
    slot: Mutex<Slot<L::Engine>>,
    retry_after: Duration,
    launches: AtomicUsize,
}

impl<L: EngineLauncher> SharedEngine<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            slot: Mutex::new(Slot::Empty),
            retry_after: DEFAULT_RETRY_AFTER,
            launches: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Get the running instance, launching or relaunching it if needed.
    ///
    /// The slot lock is held across the launch, so at most one launch is in
    /// flight and everyone queued behind it sees its result.
    pub async fn acquire(&self) -> Result<Arc<L::Engine>> {
        let mut slot = self.slot.lock().await;

        match &*slot {
            Slot::Running(engine) if engine.is_connected() => return Ok(Arc::clone(engine)),
            Slot::Running(_) => warn!("Rendering engine disconnected, relaunching"),
            Slot::Failed { at, reason } if at.elapsed() < self.retry_after => {
                return Err(Error::BackendUnavailable(reason.clone()));
            }
            Slot::Failed { .. } | Slot::Empty => {}
        }

        self.launches.fetch_add(1, Ordering::SeqCst);
        match self.launcher.launch().await {
            Ok(engine) => {
                info!("Rendering engine started");
                let engine = Arc::new(engine);
                *slot = Slot::Running(Arc::clone(&engine));
                Ok(engine)
            }
            Err(e) => {
                let reason = match e {
                    Error::BackendUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                warn!("Rendering engine failed to start: {}", reason);
                *slot = Slot::Failed {
                    at: Instant::now(),
                    reason: reason.clone(),
                };
                Err(Error::BackendUnavailable(reason))
            }
        }
    }

    /// Drop `engine` from the slot if it is still the current instance.
    ///
    /// Used when a session cannot be opened on an instance that still
    /// claims to be connected.
    pub async fn invalidate(&self, engine: &Arc<L::Engine>) {
        let mut slot = self.slot.lock().await;
        if let Slot::Running(current) = &*slot
            && Arc::ptr_eq(current, engine)
        {
            *slot = Slot::Empty;
        }
    }

    /// Number of launch attempts so far.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}
