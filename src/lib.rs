// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod tree;
pub mod utils;

// Entry point used by main.rs and the HTTP tests.
pub use routes::create_router;
