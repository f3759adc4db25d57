//! Top-level facade over the renderer core crates.
//!
//! Re-exports every workspace member crate under one name, so downstream
//! binaries and crates depend on a single path. Window, swapchain and GPU
//! device creation are out of scope here; [`editor`]'s
//! `WindowBackend`/`RendererBackend` traits are the seam a concrete
//! renderer plugs into.

pub use ren_asset as asset;
pub use ren_core as core;
pub use ren_editor as editor;
pub use ren_graph as graph;
pub use ren_handle as handle;
pub use ren_job as job;
pub use ren_watch as watch;
