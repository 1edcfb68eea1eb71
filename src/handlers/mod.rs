// src/handlers/mod.rs

pub mod achievements;
pub mod progress;
pub mod quiz;
