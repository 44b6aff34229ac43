//! Core library for music-link-relay
pub mod config;
pub mod error;
pub mod models;
pub mod api;
pub mod links;
pub mod scrape;
pub mod session;
pub mod sync;
pub mod handler;
pub mod listener;
pub mod util;
