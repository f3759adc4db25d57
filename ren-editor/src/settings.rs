//! Editor-wide settings paths and persistence.
//!
//! Grounded on `examples/original_source/editor/Editor.hpp`/`Editor.cpp`'s
//! `editor_settings_directory`/`editor_recently_opened_list_path`/
//! `editor_default_project_directory` (recently-opened list) and
//! `examples/original_source/editor/UIWidgets.cpp`'s
//! `editor_dialog_list_path`/`load_dialog_paths`/`save_dialog_paths`/
//! `FileDialogGuidFromName` (per-dialog last-used path). `REN_PROJECT_HOME`
//! overrides the default project directory and `REN_ADAPTER` selects a
//! graphics adapter by name; both are read straight from the
//! environment, matching the original's `CmdLine`/env-var conventions.

use ren_asset::Guid64;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const PROJECT_HOME_ENV: &str = "REN_PROJECT_HOME";
pub const ADAPTER_ENV: &str = "REN_ADAPTER";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// `<app-data>/ren/editor`. There's no platform app-data crate in this
/// workspace's dependency stack, so the home directory stands in for
/// `app_data_directory` the way `editor_default_project_directory` already
/// stands in for it below.
pub fn editor_settings_directory() -> PathBuf {
    home_dir().join("ren").join("editor")
}

pub fn editor_recently_opened_list_path() -> PathBuf {
    editor_settings_directory().join("recently-opened.txt")
}

pub fn editor_dialog_list_path() -> PathBuf {
    editor_settings_directory().join("dialogs.txt")
}

/// The project directory to default to when none is passed on the
/// command line: `$REN_PROJECT_HOME` if set, else `~/ren-projects`.
pub fn editor_default_project_directory() -> PathBuf {
    std::env::var_os(PROJECT_HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join("ren-projects"))
}

/// The graphics adapter name requested via `$REN_ADAPTER`, if any.
pub fn requested_adapter() -> Option<String> {
    std::env::var(ADAPTER_ENV).ok()
}

/// Derives the GUID a file-dialog callsite is keyed by in `dialogs.txt`,
/// from its (stable, human-authored) title string.
pub fn dialog_guid_for_title(title: &str) -> Guid64 {
    Guid64::from_hash_of(title.as_bytes())
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    let text = std::fs::read_to_string(path).ok()?;
    Some(
        text.lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    )
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = String::new();
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    std::fs::write(path, text)
}

/// Reads `recently-opened.txt`: one absolute path per line, oldest first,
/// most-recently-opened last. Returns an empty list if the file doesn't
/// exist yet.
pub fn load_recently_opened(path: &Path) -> Vec<PathBuf> {
    read_lines(path)
        .unwrap_or_default()
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

/// Writes `entries` to `recently-opened.txt` verbatim, one absolute path
/// per line. Callers own the most-recent-last ordering the file format
/// pins; this function doesn't reorder what it's given.
pub fn save_recently_opened(path: &Path, entries: &[PathBuf]) -> std::io::Result<()> {
    write_lines(path, entries.iter().map(|p| p.display().to_string()))
}

/// Reads `dialogs.txt`: one `"<guid-hex>:<absolute-path>"` line per
/// file-dialog callsite. Malformed lines (no `:`, or an unparseable GUID)
/// are skipped rather than failing the whole load.
pub fn load_dialogs(path: &Path) -> HashMap<Guid64, PathBuf> {
    let mut dialogs = HashMap::new();
    for line in read_lines(path).unwrap_or_default() {
        let Some((guid_str, path_str)) = line.split_once(':') else {
            continue;
        };
        let Some(guid) = Guid64::from_hex_string(guid_str) else {
            continue;
        };
        dialogs.insert(guid, PathBuf::from(path_str));
    }
    dialogs
}

/// Writes `dialogs` to `dialogs.txt`, one `"<guid-hex>:<absolute-path>"`
/// line per entry.
pub fn save_dialogs(path: &Path, dialogs: &HashMap<Guid64, PathBuf>) -> std::io::Result<()> {
    write_lines(
        path,
        dialogs
            .iter()
            .map(|(guid, p)| format!("{guid}:{}", p.display())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_recently_opened_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recently-opened.txt");
        let entries = vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")];
        save_recently_opened(&path, &entries).unwrap();
        assert_eq!(load_recently_opened(&path), entries);
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recently-opened.txt");
        std::fs::write(&path, "/tmp/a\r\n/tmp/b\r\n").unwrap();
        assert_eq!(
            load_recently_opened(&path),
            vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]
        );
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.txt");
        assert!(load_recently_opened(&path).is_empty());
        assert!(load_dialogs(&path).is_empty());
    }

    #[test]
    fn round_trips_dialogs_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialogs.txt");
        let mut dialogs = HashMap::new();
        dialogs.insert(dialog_guid_for_title("Open Project##open_project"), PathBuf::from("/tmp/projects"));
        dialogs.insert(dialog_guid_for_title("Export Scene##export_scene"), PathBuf::from("/tmp/exports"));
        save_dialogs(&path, &dialogs).unwrap();
        assert_eq!(load_dialogs(&path), dialogs);
    }

    #[test]
    fn dialog_guid_is_stable_and_distinct_per_title() {
        let a = dialog_guid_for_title("Open Project");
        let b = dialog_guid_for_title("Open Project");
        let c = dialog_guid_for_title("Export Scene");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
