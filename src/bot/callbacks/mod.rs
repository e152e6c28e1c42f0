//! Callbacks module for handling all inline keyboard callback queries
//!
//! - `callback_types`: Parsing and rendering of callback data
//! - `album_callbacks`: Done / Preview / Save / Cancel while building an album
//! - `library_callbacks`: Browsing and deleting saved albums

pub mod album_callbacks;
pub mod callback_types;
pub mod library_callbacks;

pub use callback_types::CallbackAction;
