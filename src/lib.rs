// src/lib.rs
//! Dependency health aggregation for the exam portal: probes the mail
//! gateway, object storage and identity provider, and serves a cached,
//! single-flight aggregate verdict.

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
