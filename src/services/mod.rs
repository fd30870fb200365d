// src/services/mod.rs

pub mod progress;
pub mod recommendations;
pub mod scoring;
