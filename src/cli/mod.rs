//! Command handlers for the `msig` binary

pub mod commands;

pub use commands::{cmd_bare, cmd_digest, cmd_sign, cmd_verify, CliResult};
