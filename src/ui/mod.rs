//! UI components for Bookwright

pub mod editor;
pub mod image_dialog;
pub mod new_book;
pub mod notice;
pub mod surface;
pub mod welcome;
