//! Advisory mutex
//!
//! A per-database lock driven entirely by protocol requests. It records only
//! whether it is held, not by whom: any request on any connection may release
//! it. There is no timeout, so a holder that disappears without unlocking
//! leaves the database locked until someone else issues an unlock.

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Returned when unlocking a mutex that is not locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Mutex was already unlocked.")]
pub struct UnlockError;

#[derive(Debug, Default)]
pub struct AdvisoryMutex {
    locked: Mutex<bool>,
    released: Condvar,
}

impl AdvisoryMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling thread until the mutex is free, then take it
    pub fn lock(&self) {
        let mut locked = self.locked.lock();
        while *locked {
            self.released.wait(&mut locked);
        }
        *locked = true;
    }

    /// Take the mutex if it is free
    pub fn try_lock(&self) -> bool {
        let mut locked = self.locked.lock();
        if *locked {
            return false;
        }
        *locked = true;
        true
    }

    /// Release the mutex, waking one waiter
    pub fn unlock(&self) -> Result<(), UnlockError> {
        let mut locked = self.locked.lock();
        if !*locked {
            return Err(UnlockError);
        }
        *locked = false;
        self.released.notify_one();
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        *self.locked.lock()
    }
}
