//! rollout-core - Core library for rollout
//!
//! This crate manages the release history of a deployment target:
//! - Timestamped release directories under `releases/`
//! - Atomic cutover of the `current` symlink
//! - Rollback by re-pointing `current`
//! - Pruning old releases without touching the live one
//! - A deploy pipeline tying transfer, cutover and service reload together

pub mod config;
pub mod deploy;
pub mod error;
pub mod history;
pub mod manager;
pub mod pointer;
pub mod release;
pub mod target;
mod utils;

pub use error::{Error, Result};
pub use manager::ReleaseManager;
pub use release::{Release, ReleaseId};
pub use target::DeploymentTarget;
