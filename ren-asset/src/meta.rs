//! `.meta` sidecar schema for gltf scene files.
//!
//! Grounded on `examples/original_source/editor/Meta.{hpp,cpp}`: each
//! `<scene>.gltf.meta` file records, per mesh primitive, the name the GUID
//! was derived from, the mesh/primitive index pair it maps back to in the
//! gltf document, and the GUID itself.

use crate::guid::Guid64;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetaMesh {
    pub name: String,
    pub mesh_id: u32,
    pub primitive_id: u32,
    pub guid: Guid64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct MetaGltf {
    pub meshes: Vec<MetaMesh>,
}

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("failed to read {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(std::path::PathBuf, serde_json::Error),
}

impl MetaGltf {
    pub fn load(path: &std::path::Path) -> Result<MetaGltf, MetaError> {
        let text = std::fs::read_to_string(path).map_err(|e| MetaError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| MetaError::Parse(path.to_path_buf(), e))
    }

    pub fn save(&self, path: &std::path::Path) -> Result<(), MetaError> {
        let text = serde_json::to_string_pretty(self).expect("MetaGltf always serializes");
        std::fs::write(path, text).map_err(|e| MetaError::Read(path.to_path_buf(), e))
    }

    pub fn find(&self, guid: Guid64) -> Option<&MetaMesh> {
        self.meshes.iter().find(|mesh| mesh.guid == guid)
    }

    /// Derives a `.meta` document for `document`, the parsed contents of
    /// `gltf_filename`. Every mesh primitive gets a GUID derived from
    /// `"<stem>::<mesh-name>::<primitive-index>"`, matching
    /// `meta_gltf_generate`.
    pub fn generate(document: &gltf::Document, gltf_filename: &std::path::Path) -> MetaGltf {
        let stem = gltf_filename
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mut meshes = Vec::new();
        for (mesh_index, mesh) in document.meshes().enumerate() {
            let mesh_name = mesh.name().unwrap_or("mesh").to_string();
            for (primitive_index, _primitive) in mesh.primitives().enumerate() {
                let guid_src = format!("{stem}::{mesh_name}::{primitive_index}");
                let guid = Guid64::for_mesh(stem, &mesh_name, primitive_index);
                meshes.push(MetaMesh {
                    name: guid_src,
                    mesh_id: mesh_index as u32,
                    primitive_id: primitive_index as u32,
                    guid,
                });
            }
        }
        MetaGltf { meshes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let meta = MetaGltf {
            meshes: vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid: Guid64::for_mesh("scene", "Cube", 0),
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf.meta");
        meta.save(&path).unwrap();
        let loaded = MetaGltf::load(&path).unwrap();
        assert_eq!(meta, loaded);
    }

    #[test]
    fn find_locates_mesh_by_guid() {
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        let meta = MetaGltf {
            meshes: vec![MetaMesh {
                name: "scene::Cube::0".into(),
                mesh_id: 0,
                primitive_id: 0,
                guid,
            }],
        };
        assert!(meta.find(guid).is_some());
        assert!(meta.find(Guid64::for_mesh("scene", "Other", 0)).is_none());
    }
}
