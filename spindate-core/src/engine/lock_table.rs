use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::UserId;

/// Non-blocking per-user lock table for the Pair Formation Engine, keyed
/// on user id so state transitions serialize per user. The same `SET NX`
/// busy-lock idea a Redis-backed matcher would use, reimplemented as an
/// in-process `DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>` since there is
/// no shared Redis instance backing this core.
///
/// `try_lock` never blocks: an engine invocation that cannot acquire a lock
/// returns "busy" immediately and lets the next trigger retry, rather than
/// queuing behind a blocking lock.
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub fn try_lock(&self, user_id: UserId) -> Option<OwnedMutexGuard<()>> {
        let mutex = self
            .locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_try_lock_on_same_user_fails_while_first_held() {
        let table = LockTable::new();
        let user = UserId::new_v4();
        let guard = table.try_lock(user);
        assert!(guard.is_some());
        assert!(table.try_lock(user).is_none());
        drop(guard);
        assert!(table.try_lock(user).is_some());
    }

    #[test]
    fn different_users_lock_independently() {
        let table = LockTable::new();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let _guard_a = table.try_lock(a);
        assert!(table.try_lock(b).is_some());
    }
}
