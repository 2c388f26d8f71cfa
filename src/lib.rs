pub mod app;
pub mod audio;
pub mod catalog;
pub mod collections;
pub mod config;
pub mod core;
pub mod library;
pub mod model;
pub mod stats;
pub mod transport;
