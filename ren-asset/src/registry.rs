//! In-memory registry of gltf scenes and the meshes compiled from them.
//!
//! Generalizes the arena-backed linked lists in
//! `examples/original_source/editor/Editor.hpp`'s `EditorProjectContext`
//! (`m_gltf_scenes`, `m_meshes`) into plain `HashMap`s; a mesh is dirty
//! per `examples/original_source/editor/AssetCompiler.cpp`'s `is_dirty`
//! check: `mtime(blob) < max(mtime(gltf), mtime(bin), mtime(meta))`,
//! treating a missing file's mtime as zero.

use crate::compiler::{MeshCompileJobPayload, META_EXT};
use crate::guid::Guid64;
use crate::meta::MetaGltf;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct MeshEntry {
    pub gltf_path: PathBuf,
    pub blob_path: PathBuf,
    pub dirty: bool,
}

pub struct GltfSceneEntry {
    pub gltf_path: PathBuf,
    pub mesh_guids: Vec<Guid64>,
}

/// Tracks every known gltf scene (keyed by its `.gltf` filename) and every
/// mesh compiled from one (keyed by its [`Guid64`]).
#[derive(Default)]
pub struct AssetRegistry {
    pub gltf_dir: PathBuf,
    pub content_dir: PathBuf,
    gltf_scenes: HashMap<PathBuf, GltfSceneEntry>,
    meshes: HashMap<Guid64, MeshEntry>,
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn blob_path_for(content_dir: &Path, guid: Guid64) -> PathBuf {
    content_dir.join(guid.to_hex_string())
}

impl AssetRegistry {
    pub fn new(gltf_dir: impl Into<PathBuf>, content_dir: impl Into<PathBuf>) -> AssetRegistry {
        AssetRegistry {
            gltf_dir: gltf_dir.into(),
            content_dir: content_dir.into(),
            gltf_scenes: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    pub fn mesh(&self, guid: Guid64) -> Option<&MeshEntry> {
        self.meshes.get(&guid)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (&Guid64, &MeshEntry)> {
        self.meshes.iter()
    }

    pub fn gltf_scenes(&self) -> impl Iterator<Item = (&PathBuf, &GltfSceneEntry)> {
        self.gltf_scenes.iter()
    }

    /// Reads `<gltf_dir>/<meta_filename>` (a `<scene>.gltf.meta` file) and
    /// registers every mesh it lists, computing dirtiness from the newest
    /// of the gltf/bin/meta source mtimes against the compiled blob's.
    pub fn register_gltf_scene(&mut self, meta_filename: &Path) -> Result<(), crate::meta::MetaError> {
        let meta_path = self.gltf_dir.join(meta_filename);
        let meta = MetaGltf::load(&meta_path)?;
        let gltf_filename = strip_meta_extension(meta_filename);
        let gltf_path = self.gltf_dir.join(&gltf_filename);
        let bin_path = gltf_path.with_extension("bin");

        let newest_source = mtime(&gltf_path)
            .unwrap_or(UNIX_EPOCH)
            .max(mtime(&bin_path).unwrap_or(UNIX_EPOCH))
            .max(mtime(&meta_path).unwrap_or(UNIX_EPOCH));

        let mut mesh_guids = Vec::with_capacity(meta.meshes.len());
        for mesh in &meta.meshes {
            let blob_path = blob_path_for(&self.content_dir, mesh.guid);
            let blob_mtime = mtime(&blob_path).unwrap_or(UNIX_EPOCH);
            let dirty = blob_mtime < newest_source;
            self.meshes.insert(
                mesh.guid,
                MeshEntry {
                    gltf_path: gltf_path.clone(),
                    blob_path,
                    dirty,
                },
            );
            mesh_guids.push(mesh.guid);
        }

        self.gltf_scenes.insert(
            gltf_filename,
            GltfSceneEntry {
                gltf_path,
                mesh_guids,
            },
        );
        Ok(())
    }

    pub fn unregister_gltf_scene(&mut self, meta_filename: &Path) {
        let gltf_filename = strip_meta_extension(meta_filename);
        if let Some(scene) = self.gltf_scenes.remove(&gltf_filename) {
            for guid in scene.mesh_guids {
                self.meshes.remove(&guid);
            }
        }
    }

    pub fn unregister_all_gltf_scenes(&mut self) {
        self.gltf_scenes.clear();
        self.meshes.clear();
    }

    /// Marks the mesh named by a compiled blob's filename (its GUID's hex
    /// string) as clean, if it's a registered mesh.
    pub fn register_mesh_content(&mut self, blob_filename: &Path) {
        let Some(guid) = blob_filename.to_str().and_then(Guid64::from_hex_string) else {
            return;
        };
        if let Some(mesh) = self.meshes.get_mut(&guid) {
            mesh.dirty = false;
        }
    }

    /// A blob disappearing makes its mesh dirty again.
    pub fn unregister_mesh_content(&mut self, guid: Guid64) {
        if let Some(mesh) = self.meshes.get_mut(&guid) {
            mesh.dirty = true;
        }
    }

    /// Builds the job payload list for a compilation pass: every mesh when
    /// `dirty_only` is `false`, otherwise only meshes flagged dirty.
    pub fn collect_compile_jobs(&self, dirty_only: bool) -> Vec<MeshCompileJobPayload> {
        self.meshes
            .iter()
            .filter(|(_, mesh)| !dirty_only || mesh.dirty)
            .map(|(guid, mesh)| MeshCompileJobPayload {
                gltf_path: mesh.gltf_path.clone(),
                blob_path: mesh.blob_path.clone(),
                guid: *guid,
            })
            .collect()
    }
}

fn strip_meta_extension(meta_filename: &Path) -> PathBuf {
    match meta_filename.extension() {
        Some(ext) if ext == META_EXT => meta_filename.with_extension(""),
        _ => meta_filename.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaMesh;

    fn write_meta(dir: &Path, gltf_name: &str, meshes: Vec<MetaMesh>) {
        let meta = MetaGltf { meshes };
        meta.save(&dir.join(format!("{gltf_name}.{META_EXT}"))).unwrap();
    }

    #[test]
    fn register_marks_missing_blob_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let gltf_dir = dir.path().join("gltf");
        let content_dir = dir.path().join("content");
        std::fs::create_dir_all(&gltf_dir).unwrap();
        std::fs::write(gltf_dir.join("scene.gltf"), b"{}").unwrap();
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        write_meta(
            &gltf_dir,
            "scene.gltf",
            vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid,
            }],
        );

        let mut registry = AssetRegistry::new(&gltf_dir, &content_dir);
        registry
            .register_gltf_scene(Path::new(&format!("scene.gltf.{META_EXT}")))
            .unwrap();
        assert!(registry.mesh(guid).unwrap().dirty);
    }

    #[test]
    fn unregister_scene_drops_its_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let gltf_dir = dir.path().join("gltf");
        let content_dir = dir.path().join("content");
        std::fs::create_dir_all(&gltf_dir).unwrap();
        std::fs::write(gltf_dir.join("scene.gltf"), b"{}").unwrap();
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        write_meta(
            &gltf_dir,
            "scene.gltf",
            vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid,
            }],
        );

        let mut registry = AssetRegistry::new(&gltf_dir, &content_dir);
        let meta_filename = PathBuf::from(format!("scene.gltf.{META_EXT}"));
        registry.register_gltf_scene(&meta_filename).unwrap();
        registry.unregister_gltf_scene(&meta_filename);
        assert!(registry.mesh(guid).is_none());
    }

    #[test]
    fn bin_newer_than_blob_is_dirty_even_if_gltf_is_older() {
        let dir = tempfile::tempdir().unwrap();
        let gltf_dir = dir.path().join("gltf");
        let content_dir = dir.path().join("content");
        std::fs::create_dir_all(&gltf_dir).unwrap();
        std::fs::create_dir_all(&content_dir).unwrap();
        std::fs::write(gltf_dir.join("scene.gltf"), b"{}").unwrap();
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        write_meta(
            &gltf_dir,
            "scene.gltf",
            vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid,
            }],
        );
        std::fs::write(content_dir.join(guid.to_hex_string()), b"blob").unwrap();

        // The blob and the .gltf/.meta are all written above; bump only the
        // .bin's mtime into the future so it alone makes the mesh dirty,
        // independent of filesystem mtime resolution.
        let bin_path = gltf_dir.join("scene.bin");
        std::fs::write(&bin_path, b"buffer").unwrap();
        let bin_file = std::fs::File::options().write(true).open(&bin_path).unwrap();
        bin_file
            .set_modified(SystemTime::now() + std::time::Duration::from_secs(60))
            .unwrap();

        let mut registry = AssetRegistry::new(&gltf_dir, &content_dir);
        registry
            .register_gltf_scene(Path::new(&format!("scene.gltf.{META_EXT}")))
            .unwrap();
        assert!(registry.mesh(guid).unwrap().dirty);
    }

    #[test]
    fn content_registration_clears_dirty_flag() {
        let dir = tempfile::tempdir().unwrap();
        let gltf_dir = dir.path().join("gltf");
        let content_dir = dir.path().join("content");
        std::fs::create_dir_all(&gltf_dir).unwrap();
        std::fs::write(gltf_dir.join("scene.gltf"), b"{}").unwrap();
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        write_meta(
            &gltf_dir,
            "scene.gltf",
            vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid,
            }],
        );
        let mut registry = AssetRegistry::new(&gltf_dir, &content_dir);
        registry
            .register_gltf_scene(Path::new(&format!("scene.gltf.{META_EXT}")))
            .unwrap();
        assert!(registry.mesh(guid).unwrap().dirty);
        registry.register_mesh_content(Path::new(&guid.to_hex_string()));
        assert!(!registry.mesh(guid).unwrap().dirty);
    }
}
