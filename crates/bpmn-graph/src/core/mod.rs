//! Core abstractions for the element graph
//!
//! This module defines the data model, the command bus, the repository
//! capability the engines depend on, and the ambient pieces (errors,
//! logging, configuration).

pub mod bus;
mod config;
mod database;
mod error;
pub mod logging;
mod ready;
mod types;

pub use bus::{topics, CommandBus, Payload};
pub use config::*;
pub use database::*;
pub use error::*;
pub use logging::*;
pub use ready::*;
pub use types::*;
