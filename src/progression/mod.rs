// src/progression/mod.rs

pub mod achievements;
pub mod gate;
