// src/services/mod.rs

pub mod gate;
pub mod grading;
pub mod progress;
