//! Advisory per-user locks.
//!
//! A sync run's delete-then-insert on a calendar partition must not
//! interleave with a concurrent local mutation for the same user; both
//! paths take this lock. Different users never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            map.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
