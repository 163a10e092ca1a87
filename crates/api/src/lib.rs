//! HTTP API: configuration, server wiring, authentication and policy guards.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
