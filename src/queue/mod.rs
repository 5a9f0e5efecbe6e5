//! Timelock queue of authorized actions

pub mod pending;

pub use pending::{Bolt, PendingQueue, QueueError};
