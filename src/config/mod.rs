//! JSON configuration: engine deploy parameters and transaction templates

pub mod engine;
pub mod template;

pub use engine::{ConfigFileError, EngineConfig, DEFAULT_CHAIN_ID, DEV_ENGINE_ADDRESS, DEV_MEMBERS};
pub use template::{TemplateError, TxTemplate, DEFAULT_EXPIRY_WINDOW};
