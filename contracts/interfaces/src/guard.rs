use soroban_sdk::{symbol_short, Env, Symbol};

const LOCK: Symbol = symbol_short!("LOCKED");

/// Per-contract reentrancy lock kept in temporary storage.
///
/// Released when dropped. A failed invocation rolls back the write, so a lock
/// never outlives the call that took it.
pub struct ReentrancyGuard<'a> {
    env: &'a Env,
}

impl<'a> ReentrancyGuard<'a> {
    /// Takes the lock, or `None` if the current contract already holds it
    pub fn acquire(env: &'a Env) -> Option<Self> {
        if env.storage().temporary().has(&LOCK) {
            return None;
        }
        env.storage().temporary().set(&LOCK, &true);
        Some(Self { env })
    }

    pub fn is_locked(env: &Env) -> bool {
        env.storage().temporary().has(&LOCK)
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.env.storage().temporary().remove(&LOCK);
    }
}
