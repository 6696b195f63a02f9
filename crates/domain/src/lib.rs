//! `al-domain`: configuration, shared errors, and structured trace events
//! for the AgentLink messaging runtime.

pub mod config;
pub mod error;
pub mod trace;

pub use config::Config;
pub use error::{Error, Result};
pub use trace::TraceEvent;
