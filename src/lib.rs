//! Casual chess against a bot whose moves come from an opening book, a
//! deliberately bad heuristic, or a UCI engine.

pub mod app;
pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod models;
pub mod store;
pub mod ui;
