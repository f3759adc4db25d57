//! Top-level editor session state.
//!
//! Generalizes `EditorContext` in
//! `examples/original_source/editor/Editor.hpp`. The SDL window, ImGui UI
//! and renderer members are out of scope for this crate and represented
//! only as opaque collaborator trait objects the session holds, never
//! implemented here.

use crate::hot_reload::HotReloadHost;
use crate::project::ProjectContext;
use std::path::PathBuf;

/// Marker trait a host's concrete window implementation satisfies. No
/// methods are declared because windowing is out of scope; the session
/// only needs somewhere to put the box.
pub trait WindowBackend: Send {}

/// Marker trait a host's concrete renderer/UI implementation satisfies,
/// for the same reason as [`WindowBackend`].
pub trait RendererBackend: Send {}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EditorState {
    Startup,
    Project,
    Quit,
}

/// One open editor session: the project currently loaded (if any), the
/// hot-reloadable renderer host, and housekeeping that outlives any one
/// project (recently-opened list, window/renderer collaborators).
pub struct EditorContext {
    pub state: EditorState,
    pub project: Option<ProjectContext>,
    pub hot_reload: HotReloadHost,
    pub window: Option<Box<dyn WindowBackend>>,
    pub renderer: Option<Box<dyn RendererBackend>>,
    pub recently_opened: Vec<PathBuf>,
}

impl EditorContext {
    pub fn new(renderer_lib_path: impl Into<PathBuf>) -> EditorContext {
        EditorContext {
            state: EditorState::Startup,
            project: None,
            hot_reload: HotReloadHost::new(renderer_lib_path),
            window: None,
            renderer: None,
            recently_opened: Vec::new(),
        }
    }

    pub fn open_project(&mut self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        self.touch_recently_opened(directory.clone());
        self.project = Some(ProjectContext::new(directory));
        self.state = EditorState::Project;
    }

    pub fn close_project(&mut self) {
        self.project = None;
        self.state = EditorState::Startup;
    }

    fn touch_recently_opened(&mut self, directory: PathBuf) {
        self.recently_opened.retain(|p| p != &directory);
        self.recently_opened.insert(0, directory);
        const MAX_RECENTLY_OPENED: usize = 10;
        self.recently_opened.truncate(MAX_RECENTLY_OPENED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_a_project_enters_project_state() {
        let mut ctx = EditorContext::new("/tmp/librenderer.so");
        ctx.open_project("/tmp/my-project");
        assert_eq!(ctx.state, EditorState::Project);
        assert!(ctx.project.is_some());
        assert_eq!(ctx.recently_opened[0], PathBuf::from("/tmp/my-project"));
    }

    #[test]
    fn closing_a_project_keeps_recently_opened() {
        let mut ctx = EditorContext::new("/tmp/librenderer.so");
        ctx.open_project("/tmp/my-project");
        ctx.close_project();
        assert_eq!(ctx.state, EditorState::Startup);
        assert!(ctx.project.is_none());
        assert_eq!(ctx.recently_opened.len(), 1);
    }

    #[test]
    fn reopening_a_project_moves_it_to_the_front() {
        let mut ctx = EditorContext::new("/tmp/librenderer.so");
        ctx.open_project("/tmp/a");
        ctx.open_project("/tmp/b");
        ctx.open_project("/tmp/a");
        assert_eq!(ctx.recently_opened, vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
    }
}
