//! Content-addressed asset pipeline: gltf mesh GUIDs, the `.meta` sidecar
//! schema, a dirty-tracking registry, the mesh compiler and the
//! watcher glue that keeps the registry in sync with the filesystem.
//!
//! Grounded on `examples/original_source/editor/{Guid,Meta,AssetCompiler,
//! AssetWatcher}.{hpp,cpp}`: content-addressed gltf mesh compilation and
//! the registry/watcher glue that keeps compiled blobs in sync with their
//! sources.

mod compiler;
mod guid;
mod meta;
mod registry;
mod watcher;

pub use compiler::{
    compile_mesh, launch_asset_compilation, AssetCompilationScope, AssetCompilerSession,
    CompileError, MeshCompileJobPayload, MeshCompileJobResult, META_EXT,
};
pub use guid::Guid64;
pub use meta::{MetaError, MetaGltf, MetaMesh};
pub use registry::{AssetRegistry, GltfSceneEntry, MeshEntry};
pub use watcher::AssetWatcher;
