//! Execution engine
//!
//! Orchestrates authorization (`load`) and timelocked execution (`fire`) on
//! top of the member set, signature bundle, and pending queue. The clock and
//! the effect executor are injected collaborators.
//!
//! # Example
//!
//! ```ignore
//! use msig::engine::{ExecutionEngine, Ledger, SystemClock};
//!
//! let mut engine = ExecutionEngine::new(&config, Arc::new(SystemClock), Ledger::new())?;
//!
//! // Members sign the hash for the current nonce out of band
//! let hash = engine.signing_hash(&action);
//!
//! match engine.load(action, &signatures)? {
//!     LoadOutcome::Executed { .. } => {}           // wait == 0
//!     LoadOutcome::Queued { ready_at, .. } => {}   // call fire() after ready_at
//! }
//! ```

pub mod clock;
pub mod engine;
pub mod executor;
pub mod nested;
pub mod shared;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineError, ExecutionEngine, Fired, LoadOutcome};
pub use executor::{
    CallContext, EffectCall, EffectError, EffectExecutor, Ledger, Program, TransferProgram,
};
pub use nested::EngineProgram;
pub use shared::SharedEngine;
