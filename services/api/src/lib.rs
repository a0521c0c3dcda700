pub mod adapters;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod web;
