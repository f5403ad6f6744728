//! Storage abstractions for service layer
//!
//! Holds the file-backed map store that keeps an in-memory map authoritative
//! and mirrors it to a pretty-printed JSON document.

pub mod json_map_store;
