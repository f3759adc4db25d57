//! Hot-reload host ABI and editor session/project glue.
//!
//! Grounded on `examples/original_source/editor/Editor.{hpp,cpp}` and
//! `examples/original_source/lib/hot-reload.cpp`. Window, UI and renderer
//! concerns are out of scope and only appear as opaque collaborator
//! trait objects on [`context::EditorContext`].

pub mod context;
pub mod hot_reload;
pub mod project;
pub mod settings;

pub use context::{EditorContext, EditorState, RendererBackend, WindowBackend};
pub use hot_reload::{DrawInfo, HotReloadError, HotReloadHost, RendererInfo, Vtbl};
pub use project::{BackgroundJob, ProjectContext, SceneNode, SceneNodeKey};
