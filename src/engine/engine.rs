//! Authorization and timelocked execution
//!
//! Two entry points drive the engine:
//! - `load`: check expiry, verify a quorum signed the action at the current
//!   nonce, enqueue it, and fire immediately when no timelock is configured
//! - `fire`: execute the head bolt once its wait has elapsed
//!
//! Firing consumes the head slot before the effect runs. A failing effect is
//! reported to the caller but cannot wedge the queue.

use std::sync::Arc;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::core::Action;
use crate::crypto::{Address, B256};
use crate::domain::Domain;
use crate::engine::clock::Clock;
use crate::engine::executor::{EffectCall, EffectError, EffectExecutor};
use crate::multisig::{AuthError, ConfigError, MemberSet, SignatureBundle};
use crate::queue::{Bolt, PendingQueue, QueueError};

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Action expired at {expiry}, now {now}")]
    Expired { expiry: u64, now: u64 },
    #[error("Effect of bolt {nonce} failed: {source}")]
    Effect { nonce: u64, source: EffectError },
    #[error("Engine lock poisoned")]
    LockPoisoned,
    #[error("Engine is busy")]
    Busy,
}

/// Result of a successful `load`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Authorized and waiting for its timelock
    Queued { nonce: u64, ready_at: u64 },
    /// Authorized and executed in the same call
    Executed { nonce: u64, output: Vec<u8> },
}

impl LoadOutcome {
    pub fn nonce(&self) -> u64 {
        match self {
            LoadOutcome::Queued { nonce, .. } | LoadOutcome::Executed { nonce, .. } => *nonce,
        }
    }
}

/// Result of a successful `fire`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub nonce: u64,
    pub output: Vec<u8>,
}

/// Threshold multisig engine with a FIFO timelock
pub struct ExecutionEngine<E: EffectExecutor> {
    domain: Domain,
    members: MemberSet,
    queue: PendingQueue,
    clock: Arc<dyn Clock>,
    executor: E,
}

impl<E: EffectExecutor> ExecutionEngine<E> {
    /// Create an engine; fails outright on an invalid member configuration
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        executor: E,
    ) -> Result<Self, EngineError> {
        let members = config.member_set()?;
        log::info!(
            "Engine {} created: {} members, chain {}, wait {}s",
            config.address,
            members.description(),
            config.chain_id,
            config.wait
        );
        Ok(Self {
            domain: Domain::new(config.chain_id, config.address),
            members,
            queue: PendingQueue::new(config.wait),
            clock,
            executor,
        })
    }

    /// Authorize `action` and enqueue it at the current nonce
    ///
    /// With no timelock the action also fires within this call, and an
    /// effect failure is returned even though the nonce has been consumed.
    pub fn load(
        &mut self,
        action: Action,
        signatures: &SignatureBundle,
    ) -> Result<LoadOutcome, EngineError> {
        let now = self.clock.now();
        let nonce = self.admit(action, signatures, now)?;
        if self.queue.is_timelocked() {
            return Ok(self.queued(nonce, now));
        }
        let fired = self.fire_at(now)?;
        Ok(LoadOutcome::Executed {
            nonce: fired.nonce,
            output: fired.output,
        })
    }

    /// `load`, with any inline fire running on `executor` instead of the
    /// engine's own
    ///
    /// Used when the engine itself is called from inside another effect and
    /// must act on the caller's state.
    pub fn load_with(
        &mut self,
        action: Action,
        signatures: &SignatureBundle,
        executor: &mut dyn EffectExecutor,
    ) -> Result<LoadOutcome, EngineError> {
        let now = self.clock.now();
        let nonce = self.admit(action, signatures, now)?;
        if self.queue.is_timelocked() {
            return Ok(self.queued(nonce, now));
        }
        let fired = Self::fire_head(&mut self.queue, self.domain.engine, executor, now)?;
        Ok(LoadOutcome::Executed {
            nonce: fired.nonce,
            output: fired.output,
        })
    }

    /// Execute the head bolt if its wait has elapsed
    pub fn fire(&mut self) -> Result<Fired, EngineError> {
        let now = self.clock.now();
        self.fire_at(now)
    }

    /// `fire` against an external executor
    pub fn fire_with(&mut self, executor: &mut dyn EffectExecutor) -> Result<Fired, EngineError> {
        let now = self.clock.now();
        Self::fire_head(&mut self.queue, self.domain.engine, executor, now)
    }

    /// Expiry and signature checks, then enqueue; returns the assigned nonce
    fn admit(
        &mut self,
        action: Action,
        signatures: &SignatureBundle,
        now: u64,
    ) -> Result<u64, EngineError> {
        if action.is_expired(now) {
            log::warn!("Rejected expired action (expiry {}, now {})", action.expiry, now);
            return Err(EngineError::Expired {
                expiry: action.expiry,
                now,
            });
        }

        let nonce = self.queue.nonce();
        let hash = self.domain.signing_hash(&action, nonce);
        if let Err(e) = signatures.verify(&hash, &self.members) {
            log::warn!("Rejected action at nonce {}: {}", nonce, e);
            return Err(e.into());
        }

        debug_assert!(self.queue.is_timelocked() || self.queue.is_empty());
        Ok(self.queue.enqueue(action, now))
    }

    fn queued(&self, nonce: u64, now: u64) -> LoadOutcome {
        let ready_at = now.saturating_add(self.queue.wait());
        log::info!("Queued bolt {} (ready at {})", nonce, ready_at);
        LoadOutcome::Queued { nonce, ready_at }
    }

    /// Fire against the engine's own executor at a time already read
    fn fire_at(&mut self, now: u64) -> Result<Fired, EngineError> {
        Self::fire_head(&mut self.queue, self.domain.engine, &mut self.executor, now)
    }

    fn fire_head<X: EffectExecutor + ?Sized>(
        queue: &mut PendingQueue,
        engine: Address,
        executor: &mut X,
        now: u64,
    ) -> Result<Fired, EngineError> {
        queue.ready_head(now)?;

        // The slot is consumed whatever the effect does
        let bolt = queue.pop_head()?;
        let call = EffectCall::from(&bolt.action);

        match executor.execute(engine, &call) {
            Ok(output) => {
                log::info!(
                    "Fired bolt {}: {} to {} with value {}",
                    bolt.nonce,
                    call.mode,
                    call.target,
                    call.value
                );
                Ok(Fired {
                    nonce: bolt.nonce,
                    output,
                })
            }
            Err(source) => {
                log::warn!("Bolt {} effect failed: {}", bolt.nonce, source);
                Err(EngineError::Effect {
                    nonce: bolt.nonce,
                    source,
                })
            }
        }
    }

    /// Hash members must sign for `action` to load next
    pub fn signing_hash(&self, action: &Action) -> B256 {
        self.domain.signing_hash(action, self.queue.nonce())
    }

    pub fn address(&self) -> Address {
        self.domain.engine
    }

    pub fn chain_id(&self) -> u64 {
        self.domain.chain_id
    }

    pub fn domain_separator(&self) -> &B256 {
        self.domain.separator()
    }

    /// Nonce the next loaded action will receive
    pub fn nonce(&self) -> u64 {
        self.queue.nonce()
    }

    /// Nonce of the oldest unfired bolt
    pub fn next(&self) -> u64 {
        self.queue.next()
    }

    pub fn wait(&self) -> u64 {
        self.queue.wait()
    }

    pub fn members(&self) -> &MemberSet {
        &self.members
    }

    /// Queued bolts from head to tail
    pub fn pending(&self) -> impl Iterator<Item = &Bolt> {
        self.queue.iter()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }
}
