pub mod adapters;
pub mod config;
pub mod database;
pub mod plugins;
