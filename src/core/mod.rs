// src/core/mod.rs
pub mod detection;
pub mod gating;
pub mod recognition;
pub mod services;
pub mod tracking;
