//! Stand-in for a supervised connection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::Supervised;
use crate::domain::ConnectionState;
use crate::error::{Error, Result};

/// Reports a settable state and counts restarts. Restarting does not change
/// the reported state; tests move it explicitly.
pub struct FakeSupervisor {
    state: Mutex<ConnectionState>,
    fail_restarts: AtomicBool,
    restarts: AtomicUsize,
}

impl FakeSupervisor {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: Mutex::new(state),
            fail_restarts: AtomicBool::new(false),
            restarts: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    pub fn fail_restarts(&self, fail: bool) {
        self.fail_restarts.store(fail, Ordering::SeqCst);
    }

    /// Restart calls so far, failed ones included.
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Supervised for FakeSupervisor {
    fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    async fn restart(&self) -> Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if self.fail_restarts.load(Ordering::SeqCst) {
            return Err(Error::Connection("restart refused".into()));
        }
        Ok(())
    }
}
