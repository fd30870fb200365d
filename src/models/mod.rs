// src/models/mod.rs

pub mod feedback;
pub mod forum;
pub mod paper;
pub mod progress;
pub mod question;
pub mod recommendation;
pub mod submission;
pub mod user;
