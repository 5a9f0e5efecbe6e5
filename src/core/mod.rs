//! Core data types shared by the hashing, queue, and engine layers

pub mod action;

pub use action::{Action, CallMode};
