use pathdiff::diff_paths;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Mirror `input_path` from under `input_root` to under `output_root`.
///
/// A `.md` extension (any case) becomes `.html`; every other extension is kept.
/// Two inputs differing only by case map to different outputs here, but on a
/// case-insensitive filesystem they land on the same file. That case is left
/// undefined.
pub fn map_output_path(input_root: &Path, output_root: &Path, input_path: &Path) -> PathBuf {
    let relative = diff_paths(input_path, input_root).unwrap_or_else(|| input_path.to_path_buf());
    let mut output = output_root.join(relative);
    if is_markdown(&output) {
        output.set_extension("html");
    }
    output
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Create the parent directory of `path`; already existing is fine.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Forward-slash relative path used in reports and link targets.
pub fn display_relative(root: &Path, path: &Path) -> String {
    diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}
