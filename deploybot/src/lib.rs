//! deploybot: kubectl operations driven from a Slack channel.
//!
//! Commands:
//!
//!   !deploy [cluster] <app> <container> <repo:tag>  - set a workload's image
//!   !reset [cluster] <app>                          - recreate a statefulset and its PVCs
//!   !help                                           - list commands
//!
//! The cluster argument is required when the bot is configured with a
//! cluster name, so several bots can share one channel.

pub mod commands;
pub mod config;
pub mod executor;
pub mod gate;
pub mod kubectl;
pub mod output;
pub mod registry_check;
pub mod slack;

#[cfg(test)]
pub(crate) mod testing;
