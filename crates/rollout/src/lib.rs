//! rollout - operator CLI over rollout-core
//!
//! Every command is a thin wrapper over [`rollout_core::ReleaseManager`]:
//! listing releases, cutting over, rolling back, pruning and deploying.

pub mod commands;
