// Library root for the MQTT gateway

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod events;
pub mod handler;
pub mod messaging;
pub mod telemetry;
pub mod topic;
