// src/handlers/mod.rs

pub mod comments;
