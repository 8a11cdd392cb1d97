pub mod app;
pub mod backend;
pub mod config;
pub mod handler;
pub mod identity;
pub mod tui;
pub mod ui;
