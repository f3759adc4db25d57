//! Hot-reloadable renderer host ABI.
//!
//! Grounded on `examples/original_source/lib/hot-reload.cpp`: the editor
//! loads a renderer implementation from a dynamic library, calls through
//! a stable `extern "C"` vtable, and polls the library's mtime to detect
//! a rebuild, running the `unload`/`load` hooks around swapping it out.
//! The original copies the library to a differently named temp file only
//! on DLL platforms (to dodge the linker's file lock); this always copies
//! to a fresh temp path, which sidesteps the same problem uniformly on
//! every platform `libloading` supports.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Opaque, host-defined renderer construction parameters. The concrete
/// layout lives in whatever dynamic library implements [`Vtbl`].
#[repr(C)]
pub struct RendererInfo {
    _private: [u8; 0],
}

/// Opaque, host-defined per-frame draw parameters.
#[repr(C)]
pub struct DrawInfo {
    _private: [u8; 0],
}

/// The stable ABI boundary between the editor host and a renderer
/// implementation loaded from a dynamic library. Grounded on
/// `ren::hot_reload::Vtbl` (declared alongside `create_renderer`/`draw`
/// in the original, exported as a single `ren_vtbl` symbol).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Vtbl {
    pub create_renderer: unsafe extern "C" fn(info: *const RendererInfo) -> *mut c_void,
    pub draw: unsafe extern "C" fn(scene: *mut c_void, draw_info: *const DrawInfo),
    pub load: unsafe extern "C" fn(scene: *mut c_void) -> bool,
    pub unload: unsafe extern "C" fn(scene: *mut c_void),
}

pub const VTBL_SYMBOL: &[u8] = b"ren_vtbl\0";

#[derive(Debug, thiserror::Error)]
pub enum HotReloadError {
    #[error("failed to copy {0} to a temp path: {1}")]
    Copy(PathBuf, #[source] std::io::Error),
    #[error("failed to load library {0}: {1}")]
    Load(PathBuf, #[source] libloading::Error),
    #[error("failed to look up symbol {0:?} in {1}: {2}")]
    Symbol(&'static [u8], PathBuf, #[source] libloading::Error),
    #[error("failed to read mtime of {0}: {1}")]
    Mtime(PathBuf, #[source] std::io::Error),
    #[error("load hook rejected the new library")]
    LoadHookFailed,
}

fn copy_to_temp(lib_path: &Path) -> Result<PathBuf, HotReloadError> {
    let extension = lib_path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let file_name = format!(
        "{}-{}.{extension}",
        lib_path.file_stem().and_then(|s| s.to_str()).unwrap_or("renderer"),
        std::process::id(),
    );
    let dest = std::env::temp_dir().join(file_name);
    std::fs::copy(lib_path, &dest).map_err(|e| HotReloadError::Copy(lib_path.to_path_buf(), e))?;
    Ok(dest)
}

fn mtime(path: &Path) -> Result<SystemTime, HotReloadError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| HotReloadError::Mtime(path.to_path_buf(), e))
}

unsafe fn load_vtbl(library: &libloading::Library, lib_path: &Path) -> Result<Vtbl, HotReloadError> {
    let symbol = library
        .get::<Vtbl>(VTBL_SYMBOL)
        .map_err(|e| HotReloadError::Symbol(VTBL_SYMBOL, lib_path.to_path_buf(), e))?;
    Ok(*symbol)
}

/// Owns the currently loaded renderer library and knows how to detect and
/// apply a rebuild.
pub struct HotReloadHost {
    lib_path: PathBuf,
    library: Option<libloading::Library>,
    vtbl: Option<Vtbl>,
    last_mtime: Option<SystemTime>,
}

impl HotReloadHost {
    pub fn new(lib_path: impl Into<PathBuf>) -> HotReloadHost {
        HotReloadHost {
            lib_path: lib_path.into(),
            library: None,
            vtbl: None,
            last_mtime: None,
        }
    }

    /// Loads the library for the first time.
    pub fn load(&mut self) -> Result<Vtbl, HotReloadError> {
        self.last_mtime = mtime(&self.lib_path).ok();
        let load_path = copy_to_temp(&self.lib_path)?;
        log::info!("hot_reload: loading {}", load_path.display());
        let library = unsafe { libloading::Library::new(&load_path) }
            .map_err(|e| HotReloadError::Load(load_path.clone(), e))?;
        let vtbl = unsafe { load_vtbl(&library, &load_path) }?;
        self.library = Some(library);
        self.vtbl = Some(vtbl);
        Ok(vtbl)
    }

    pub fn vtbl(&self) -> Vtbl {
        self.vtbl.expect("hot_reload: library not loaded yet")
    }

    /// Checks whether the library on disk changed; if so, runs the
    /// `unload` hook on `scene`, swaps in the new library and runs `load`.
    /// Returns `true` if a reload happened.
    pub fn poll_reload(&mut self, scene: *mut c_void) -> Result<bool, HotReloadError> {
        let current_mtime = match mtime(&self.lib_path) {
            Ok(ts) => ts,
            Err(_) => return Ok(false),
        };
        if Some(current_mtime) <= self.last_mtime {
            return Ok(false);
        }

        log::info!("hot_reload: {} changed, reloading", self.lib_path.display());
        let vtbl = self.vtbl();
        unsafe { (vtbl.unload)(scene) };
        self.library = None;

        let load_path = copy_to_temp(&self.lib_path)?;
        let library = unsafe { libloading::Library::new(&load_path) }
            .map_err(|e| HotReloadError::Load(load_path.clone(), e))?;
        let new_vtbl = unsafe { load_vtbl(&library, &load_path) }?;

        if !unsafe { (new_vtbl.load)(scene) } {
            return Err(HotReloadError::LoadHookFailed);
        }

        self.library = Some(library);
        self.vtbl = Some(new_vtbl);
        self.last_mtime = Some(current_mtime);
        log::info!("hot_reload: done");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_to_temp_produces_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join("libren_renderer.so");
        std::fs::write(&lib_path, b"not a real library").unwrap();
        let copied = copy_to_temp(&lib_path).unwrap();
        assert_eq!(std::fs::read(&copied).unwrap(), b"not a real library");
        let _ = std::fs::remove_file(copied);
    }

    #[test]
    fn poll_reload_without_a_loaded_library_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join("missing.so");
        let mut host = HotReloadHost::new(&lib_path);
        assert!(!host.poll_reload(std::ptr::null_mut()).unwrap());
    }
}
