//! Host side of the virtual tabletop: map storage, debounced persistence,
//! and map sessions that tie a [`canvas::engine::EngineCore`] to its
//! stored document.
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | Document and blob stores (memory and file backed) |
//! | [`services::persistence`] | Scene load/encode and the debounced save worker |
//! | [`services::session`] | One open map: engine, saves, remote updates |
//! | [`config`] | Environment-driven persistence settings |

pub mod config;
pub mod services;
pub mod store;
