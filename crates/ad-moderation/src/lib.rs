//! Moderation pipeline for vehicle classified ads.

pub mod config;
pub mod error;
pub mod moderation;
pub mod telemetry;
