//! Engine shared across threads
//!
//! `load` assigns nonces and `fire` advances the head, so both must be
//! linearized against each other. One lock guards the whole engine.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use crate::core::Action;
use crate::engine::engine::{EngineError, ExecutionEngine, Fired, LoadOutcome};
use crate::engine::executor::EffectExecutor;
use crate::multisig::SignatureBundle;

/// Cloneable handle to a single engine instance
pub struct SharedEngine<E: EffectExecutor> {
    inner: Arc<Mutex<ExecutionEngine<E>>>,
}

impl<E: EffectExecutor> Clone for SharedEngine<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: EffectExecutor> SharedEngine<E> {
    pub fn new(engine: ExecutionEngine<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ExecutionEngine<E>>, EngineError> {
        self.inner.lock().map_err(|_| EngineError::LockPoisoned)
    }

    pub fn load(
        &self,
        action: Action,
        signatures: &SignatureBundle,
    ) -> Result<LoadOutcome, EngineError> {
        self.lock()?.load(action, signatures)
    }

    pub fn fire(&self) -> Result<Fired, EngineError> {
        self.lock()?.fire()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<T>(&self, f: impl FnOnce(&mut ExecutionEngine<E>) -> T) -> Result<T, EngineError> {
        let mut engine = self.lock()?;
        Ok(f(&mut *engine))
    }

    /// Like `with`, but fails with `Busy` instead of blocking
    ///
    /// Code running inside this engine's own effect holds the lock already;
    /// calling back in must not deadlock.
    pub fn try_with<T>(
        &self,
        f: impl FnOnce(&mut ExecutionEngine<E>) -> T,
    ) -> Result<T, EngineError> {
        let mut engine = match self.inner.try_lock() {
            Ok(engine) => engine,
            Err(TryLockError::WouldBlock) => return Err(EngineError::Busy),
            Err(TryLockError::Poisoned(_)) => return Err(EngineError::LockPoisoned),
        };
        Ok(f(&mut *engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::crypto::{Address, KeyPair, U256};
    use crate::engine::clock::ManualClock;
    use crate::engine::executor::Ledger;
    use std::thread;

    #[test]
    fn test_concurrent_loads_get_distinct_nonces() {
        let mut keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.address());
        let config = EngineConfig::new(
            Address::ZERO,
            keys.iter().map(|k| k.address()).collect(),
            2,
            1,
        )
        .with_wait(100);
        let engine =
            ExecutionEngine::new(&config, Arc::new(ManualClock::new(0)), Ledger::new()).unwrap();
        let shared = SharedEngine::new(engine);
        let keys = Arc::new(keys);

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let shared = shared.clone();
                let keys = Arc::clone(&keys);
                thread::spawn(move || {
                    let action = Action::call(Address::ZERO, U256::from(i), Vec::new());
                    // Sign and load under one lock so the nonce cannot move in between
                    shared
                        .with(|engine| {
                            let hash = engine.signing_hash(&action);
                            let sigs =
                                SignatureBundle::from_parts(keys.iter().map(|k| k.sign_hash(&hash)));
                            engine.load(action, &sigs).map(|o| o.nonce())
                        })
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();

        let mut nonces: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
        assert_eq!(shared.with(|engine| engine.nonce()).unwrap(), 4);
    }

    #[test]
    fn test_fire_through_handle() {
        let mut keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.address());
        let config = EngineConfig::new(
            Address::ZERO,
            keys.iter().map(|k| k.address()).collect(),
            2,
            1,
        );
        let engine =
            ExecutionEngine::new(&config, Arc::new(ManualClock::new(0)), Ledger::new()).unwrap();
        let shared = SharedEngine::new(engine);

        assert!(matches!(shared.fire(), Err(EngineError::Queue(_))));
    }

    #[test]
    fn test_try_with_does_not_block_on_held_lock() {
        let mut keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.address());
        let config = EngineConfig::new(
            Address::ZERO,
            keys.iter().map(|k| k.address()).collect(),
            2,
            1,
        );
        let engine =
            ExecutionEngine::new(&config, Arc::new(ManualClock::new(0)), Ledger::new()).unwrap();
        let shared = SharedEngine::new(engine);

        let inner = shared.clone();
        let nested = shared.with(|_| inner.try_with(|engine| engine.nonce())).unwrap();
        assert_eq!(nested, Err(EngineError::Busy));
        assert_eq!(shared.try_with(|engine| engine.nonce()), Ok(0));
    }
}
