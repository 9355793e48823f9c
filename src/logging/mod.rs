// file: src/logging/mod.rs
// version: 1.0.0
// guid: 7a15d9c3-42b8-4f60-8e27-b391a6c50d84

//! Logging system for fyrd

pub mod logger;

pub use logger::init_logger;
