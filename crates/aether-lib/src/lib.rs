//! Core library for the Aether resource monitor
//!
//! This crate provides the core functionality for:
//! - Sampling system CPU and memory utilisation
//! - Load bucketing and model-based usage prediction
//! - Edge-triggered threshold warnings per gauge session
//! - The local user store behind sign-in/sign-up
//! - Health checks and observability

pub mod collector;
pub mod health;
pub mod models;
pub mod notifier;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod users;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
