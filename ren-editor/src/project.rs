//! Per-project editor state.
//!
//! Generalizes `EditorProjectContext` in
//! `examples/original_source/editor/Editor.hpp`: the arena-backed
//! `GenArray<EditorGltfScene>`/`GenArray<EditorMesh>` pair becomes
//! [`ren_asset::AssetRegistry`], and `GenArray<EditorSceneNode>` becomes a
//! [`ren_handle::HandleMap`] keyed by [`SceneNodeKey`].

use ren_handle::{new_key_type, HandleMap};

new_key_type! {
    pub struct SceneNodeKey;
}

pub struct SceneNode {
    pub name: String,
    pub parent: Option<SceneNodeKey>,
    pub children: Vec<SceneNodeKey>,
}

pub struct BackgroundJob {
    pub name: String,
    pub token: ren_job::JobToken,
}

pub const ASSET_DIR: &str = "assets";
pub const GLTF_DIR: &str = "glTF";
pub const CONTENT_DIR: &str = "content";
pub const MESH_DIR: &str = "mesh";

/// Everything scoped to one open project: its asset registry, scene
/// graph, background jobs and the watcher keeping the registry live.
pub struct ProjectContext {
    pub directory: std::path::PathBuf,
    pub background_jobs: Vec<BackgroundJob>,
    pub registry: ren_asset::AssetRegistry,
    pub scene_nodes: HandleMap<SceneNodeKey, SceneNode>,
    pub scene_root: SceneNodeKey,
    pub asset_watcher: Option<ren_asset::AssetWatcher>,
    pub asset_compiler_session: Option<ren_asset::AssetCompilerSession>,
}

impl ProjectContext {
    pub fn new(directory: impl Into<std::path::PathBuf>) -> ProjectContext {
        let directory = directory.into();
        let gltf_dir = directory.join(ASSET_DIR).join(GLTF_DIR);
        let content_dir = directory.join(CONTENT_DIR).join(MESH_DIR);
        let mut scene_nodes = HandleMap::new();
        let scene_root = scene_nodes.insert(SceneNode {
            name: "root".to_string(),
            parent: None,
            children: Vec::new(),
        });
        ProjectContext {
            directory,
            background_jobs: Vec::new(),
            registry: ren_asset::AssetRegistry::new(gltf_dir, content_dir),
            scene_nodes,
            scene_root,
            asset_watcher: None,
            asset_compiler_session: None,
        }
    }

    pub fn add_child_node(&mut self, parent: SceneNodeKey, name: impl Into<String>) -> SceneNodeKey {
        let child = self.scene_nodes.insert(SceneNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(parent_node) = self.scene_nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        child
    }

    pub fn retire_finished_background_jobs(&mut self) {
        self.background_jobs.retain(|job| !job.token.is_done());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_has_a_root_scene_node() {
        let project = ProjectContext::new("/tmp/some-project");
        assert!(project.scene_nodes.get(project.scene_root).is_some());
    }

    #[test]
    fn add_child_node_links_parent_and_child() {
        let mut project = ProjectContext::new("/tmp/some-project");
        let root = project.scene_root;
        let child = project.add_child_node(root, "mesh_0");
        assert_eq!(project.scene_nodes.get(child).unwrap().parent, Some(root));
        assert!(project.scene_nodes.get(root).unwrap().children.contains(&child));
    }
}
