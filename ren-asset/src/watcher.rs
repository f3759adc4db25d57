//! Glues [`ren_watch::FileWatcher`] events to [`AssetRegistry`] updates.
//!
//! Grounded on `examples/original_source/editor/AssetWatcher.cpp`'s
//! `run_asset_watcher`: gltf `.meta` edits re-register that scene, gltf/bin
//! edits re-register the scene they belong to, compiled blobs appearing or
//! disappearing flip a mesh's dirty flag, and a directory-level delete or a
//! debounced "fuzzy" event forces a full rescan of the directory it hit.

use crate::compiler::META_EXT;
use crate::registry::AssetRegistry;
use ren_watch::{FileWatchEvent, FileWatchEventType, FileWatcher, WatchError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct AssetWatcher {
    watcher: FileWatcher,
    gltf_relative: PathBuf,
    mesh_content_relative: PathBuf,
    assets_relative: PathBuf,
    content_relative: PathBuf,
}

impl AssetWatcher {
    pub fn start(
        project_root: impl Into<PathBuf>,
        assets_relative: impl Into<PathBuf>,
        gltf_relative: impl Into<PathBuf>,
        content_relative: impl Into<PathBuf>,
        mesh_content_relative: impl Into<PathBuf>,
        event_report_timeout: Duration,
    ) -> Result<AssetWatcher, WatchError> {
        let assets_relative = assets_relative.into();
        let gltf_relative = gltf_relative.into();
        let content_relative = content_relative.into();
        let mesh_content_relative = mesh_content_relative.into();

        let mut watcher = FileWatcher::start(project_root, event_report_timeout)?;
        watcher.watch_directory(".");
        watcher.watch_directory(&assets_relative);
        watcher.watch_directory(&gltf_relative);
        watcher.watch_directory(&content_relative);
        watcher.watch_directory(&mesh_content_relative);

        Ok(AssetWatcher {
            watcher,
            gltf_relative,
            mesh_content_relative,
            assets_relative,
            content_relative,
        })
    }

    /// Drains every pending event, applying each to `registry`. Returns
    /// `true` if the watch set had to be rebuilt (the OS event queue
    /// overflowed), in which case the caller should re-register every
    /// asset from scratch.
    pub fn poll(&mut self, registry: &mut AssetRegistry) -> bool {
        let mut needs_full_rescan = false;
        while let Some(event) = self.watcher.read_event() {
            if event.event_type == FileWatchEventType::QueueOverflow {
                needs_full_rescan = true;
                continue;
            }
            self.handle_event(registry, event);
        }
        needs_full_rescan
    }

    fn handle_event(&mut self, registry: &mut AssetRegistry, event: FileWatchEvent) {
        if event.event_type == FileWatchEventType::Other {
            return;
        }

        let is_fuzzy = event.event_type == FileWatchEventType::Fuzzy;
        let is_delete = matches!(
            event.event_type,
            FileWatchEventType::Removed | FileWatchEventType::RenamedFrom
        );
        let is_modify = matches!(
            event.event_type,
            FileWatchEventType::RenamedTo | FileWatchEventType::Modified
        );
        let relative_path: PathBuf = if is_fuzzy {
            event.parent.clone()
        } else {
            event.parent.join(&event.filename)
        };

        if relative_path == self.gltf_relative {
            if is_delete || is_fuzzy {
                registry.unregister_all_gltf_scenes();
                self.watcher.watch_directory(&self.gltf_relative);
            }
            return;
        }

        if relative_path == self.mesh_content_relative {
            if is_delete || is_fuzzy {
                self.watcher.watch_directory(&self.mesh_content_relative);
            }
            return;
        }

        if relative_path == self.assets_relative || relative_path == self.content_relative {
            if is_delete || is_fuzzy {
                registry.unregister_all_gltf_scenes();
                self.watcher.watch_directory(&self.assets_relative);
                self.watcher.watch_directory(&self.content_relative);
            }
            return;
        }

        if is_fuzzy {
            log::warn!("ren-asset: unhandled fuzzy event for {}", event.parent.display());
            return;
        }

        if event.parent == self.gltf_relative {
            self.handle_gltf_dir_event(registry, &event, is_modify, is_delete);
            return;
        }

        if event.parent == self.mesh_content_relative {
            self.handle_mesh_content_event(registry, &event, is_modify, is_delete);
        }
    }

    fn handle_gltf_dir_event(
        &self,
        registry: &mut AssetRegistry,
        event: &FileWatchEvent,
        is_modify: bool,
        is_delete: bool,
    ) {
        let extension = event.filename.extension().and_then(|e| e.to_str());
        if extension == Some(META_EXT) {
            registry.unregister_gltf_scene(&event.filename);
            if is_modify {
                let _ = registry.register_gltf_scene(&event.filename);
            }
            return;
        }
        if matches!(extension, Some("gltf") | Some("bin")) && is_modify {
            let meta_filename = append_meta_extension(&event.filename.with_extension("gltf"));
            registry.unregister_gltf_scene(&meta_filename);
            let _ = registry.register_gltf_scene(&meta_filename);
        }
        let _ = is_delete;
    }

    fn handle_mesh_content_event(
        &self,
        registry: &mut AssetRegistry,
        event: &FileWatchEvent,
        is_modify: bool,
        is_delete: bool,
    ) {
        use crate::guid::Guid64;
        let Some(guid) = event.filename.to_str().and_then(Guid64::from_hex_string) else {
            return;
        };
        if is_modify {
            registry.register_mesh_content(&event.filename);
        } else if is_delete {
            registry.unregister_mesh_content(guid);
        }
    }
}

fn append_meta_extension(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(META_EXT);
    PathBuf::from(s)
}
