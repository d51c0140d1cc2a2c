//! Interactive map engine for a virtual tabletop.
//!
//! This crate compiles to WebAssembly and runs in the browser, and everything
//! except [`engine::Engine`] also builds natively for tests and the
//! `tabletop` CLI. It owns the whole map: the scene of layers, tokens,
//! assets, drawings, painted cells, and fog; the pointer and keyboard state
//! machine; undo/redo; rendering; and the procedural map generator. The host
//! wires DOM events in and acts on the returned [`engine::Action`]s (redraw,
//! save, cursor, timers, notices).
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`scene`] | Scene aggregate, entities, and their mutations |
//! | [`history`] | Linear undo/redo over layers and painted cells |
//! | [`input`] | Drawing modes, input event types, and gesture state |
//! | [`tools`] | One pointer handler per drawing mode |
//! | [`hit`] | Hit-testing entities, handles, and the marquee |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`grid`] | Grid snapping, cell indices, rectangles, distance labels |
//! | [`color`] | CSS color parsing and grid contrast |
//! | [`render`] | Display-list construction in draw-pass order |
//! | [`raster`] | Executes display lists on a `tiny-skia` pixmap |
//! | [`mapgen`] | Procedural tile-and-object map images |
//! | [`consts`] | Shared numeric constants (grid size, zoom limits, timings) |

pub mod camera;
pub mod color;
pub mod consts;
pub mod engine;
pub mod grid;
pub mod history;
pub mod hit;
pub mod input;
pub mod mapgen;
pub mod raster;
pub mod render;
pub mod scene;
pub mod tools;
