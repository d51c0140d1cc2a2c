//! Map services on top of the store.
//!
//! ARCHITECTURE
//! ============
//! `persistence` owns scene encoding and debounced saving; `session` ties one
//! open map's engine to its document.

pub mod persistence;
pub mod session;
