// Foodgram - recipe sharing service

// Core types and primitives
pub mod core;

// Rows and wire types
pub mod models;

// Storage, relationship graph, stores and request context
pub mod database;
pub mod infrastructure;

// HTTP surface
pub mod api;
pub mod pagination;

// Common utilities
pub mod app_state;
pub mod config;
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
