use std::io;
use std::path::{Component, Path, PathBuf};

/// Environment variable naming the tool root.
pub const HOME_VAR: &str = "PERF_REPORT_HOME";

/// The directory the recorder writes `gen/` into and the reporter reads it from by default.
///
/// This is `$PERF_REPORT_HOME` if set, and the current directory otherwise.
pub fn tool_root() -> io::Result<PathBuf> {
    match std::env::var_os(HOME_VAR) {
        Some(home) if !home.is_empty() => absolute(Path::new(&home)),
        _ => std::env::current_dir(),
    }
}

/// Make `path` absolute against the current directory and drop `.` and `..` components.
///
/// Unlike [`std::fs::canonicalize`] the path does not have to exist and symlinks are left
/// alone.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The path of `target` relative to the directory `base`.
///
/// Both paths must be absolute and normalized, as returned by [`absolute`].
pub fn relative(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    rel
}
