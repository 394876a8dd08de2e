//! Single-slot admission gate for configuration mutations.

use std::sync::{Arc, Mutex, MutexGuard};

/// At most one client holds the lock; others are turned away, never queued.
#[derive(Debug, Default)]
pub struct AdmissionLock {
    holder: Mutex<Option<String>>,
}

impl AdmissionLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.holder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the lock for `client` without waiting.
    ///
    /// Returns whether it was taken and who holds it now.
    pub fn try_acquire(&self, client: &str) -> (bool, String) {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(holder) => (false, holder.clone()),
            None => {
                *slot = Some(client.to_string());
                (true, client.to_string())
            }
        }
    }

    /// Free the lock. Releasing a free lock does nothing.
    pub fn release(&self) {
        self.slot().take();
    }

    pub fn holder(&self) -> Option<String> {
        self.slot().clone()
    }

    /// Take the lock for the lifetime of the returned guard.
    ///
    /// On conflict the current holder is returned.
    pub fn acquire(&self, client: &str) -> Result<AdmissionGuard<'_>, String> {
        match self.try_acquire(client) {
            (true, _) => Ok(AdmissionGuard { lock: self }),
            (false, holder) => Err(holder),
        }
    }

    /// Like [`AdmissionLock::acquire`], but the guard keeps the lock alive and
    /// can be moved into a spawned task.
    pub fn acquire_owned(self: &Arc<Self>, client: &str) -> Result<OwnedAdmissionGuard, String> {
        match self.try_acquire(client) {
            (true, _) => Ok(OwnedAdmissionGuard {
                lock: Arc::clone(self),
            }),
            (false, holder) => Err(holder),
        }
    }
}

/// Releases the [`AdmissionLock`] on drop.
#[derive(Debug)]
pub struct AdmissionGuard<'a> {
    lock: &'a AdmissionLock,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Owned form of [`AdmissionGuard`].
#[derive(Debug)]
pub struct OwnedAdmissionGuard {
    lock: Arc<AdmissionLock>,
}

impl Drop for OwnedAdmissionGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
