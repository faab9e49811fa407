#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::cast_precision_loss
)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod pipeline;
pub mod plan;
pub mod retrieval;
pub mod storage;
pub mod tools;

pub use config::Config;
pub use error::{AgentError, Result};
