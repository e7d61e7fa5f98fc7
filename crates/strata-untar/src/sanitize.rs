use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result, UnsafeReason};

fn is_separator(b: u8) -> bool {
    b == b'/' || (cfg!(windows) && b == b'\\')
}

/// Check the security of an entry name. Anything that looks fishy is rejected.
///
/// Names must be archive-relative, must not contain `..`, and may only end in a
/// single trailing separator (as in `./`).
pub fn validate_name(path: &Path) -> Result<()> {
    let bytes = path.as_os_str().as_encoded_bytes();
    if bytes.is_empty() {
        return Err(Error::unsafe_path(path, UnsafeReason::Empty));
    }

    let components: Vec<&[u8]> = bytes.split(|&b| is_separator(b)).collect();
    if components[0].is_empty() || path.has_root() {
        return Err(Error::unsafe_path(path, UnsafeReason::Absolute));
    }

    let last = components.len() - 1;
    for (i, component) in components.iter().enumerate() {
        if component.is_empty() && i != last {
            return Err(Error::unsafe_path(path, UnsafeReason::EmptyComponent));
        }
        if *component == b".." {
            return Err(Error::unsafe_path(path, UnsafeReason::ParentDir));
        }
    }

    Ok(())
}

/// Link targets are only required to be present; anchoring keeps them safe.
pub fn validate_link_target<'a>(entry: &Path, target: Option<&'a Path>) -> Result<&'a Path> {
    match target {
        Some(target) if !target.as_os_str().is_empty() => Ok(target),
        _ => Err(Error::unsafe_path(entry, UnsafeReason::EmptyLinkTarget)),
    }
}

/// Lexically normalize `path` into a relative path that cannot climb above
/// its starting point: roots and `.` are dropped and `..` stops at the top.
pub fn clamp_relative(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::ParentDir => {
                result.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
        }
    }
    result
}
