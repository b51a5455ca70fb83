use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

/// A shared flag that tells the agent to stop.
///
/// Waiting is done through [`Shutdown::sleep()`] so that a request wakes the
/// sleeper immediately instead of at the end of the poll interval.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `duration`, or less if shutdown is requested.
    ///
    /// Returns true if shutdown was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, duration, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Requests shutdown on the first Ctrl-C and exits the process on the second.
    pub fn install_ctrl_c_handler(&self) -> std::io::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let shutdown = self.clone();
        std::thread::Builder::new()
            .name(String::from("ctrl-c"))
            .spawn(move || {
                runtime.block_on(async {
                    if tokio::signal::ctrl_c().await.is_err() {
                        warn!("Could not listen for Ctrl-C");
                        return;
                    }
                    info!("Interrupted, shutting down (press Ctrl-C again to quit immediately)");
                    shutdown.request();
                    if tokio::signal::ctrl_c().await.is_ok() {
                        std::process::exit(130);
                    }
                })
            })?;
        Ok(())
    }
}
