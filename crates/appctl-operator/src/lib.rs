//! App controller operator.
//!
//! Wires the reconcile core to a live cluster: configuration, tracing,
//! the kube-runtime controller loop and per-App failure backoff.

pub mod backoff;
pub mod cli;
pub mod config;
pub mod controller;
pub mod observability;

pub use crate::config::{ConfigError, ControllerSettings, LoggingConfig, OperatorConfig};
