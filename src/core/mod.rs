//! Core functionality: recent books, book creation, editing sessions and configuration

pub mod book;
pub mod config;
pub mod error;
pub mod history;
pub mod recents;
pub mod session;
