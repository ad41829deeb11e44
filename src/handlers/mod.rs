// src/handlers/mod.rs
pub mod analyze;
pub mod static_files;
