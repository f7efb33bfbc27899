// Utility module
// Configuration loading and shared helpers

pub mod config;
