// src/session/mod.rs

pub mod engine;
pub mod normalize;
pub mod registry;
