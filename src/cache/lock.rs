use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Take a guard even from a poisoned lock.
///
/// Cache state is advisory: after a panic in another thread the worst case is
/// a stale or missing entry, which the read path already tolerates. Poisoning
/// is logged and the guard recovered rather than propagated.
fn recover<G>(result: LockResult<G>, op: &'static str) -> G {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                target: "vitrine::cache",
                op,
                "recovered a poisoned cache lock, entries may be stale"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), op)
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), op)
}
