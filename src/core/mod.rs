// Core types shared across the gateway

pub mod credential;
pub mod errors;
pub mod models;
pub mod time;
