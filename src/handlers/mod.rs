// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod feedback;
pub mod forum;
pub mod papers;
pub mod progress;
pub mod submission;
