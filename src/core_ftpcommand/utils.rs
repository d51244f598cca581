use crate::constants::{CURRENT_PATH, PARENT_PATH, PATH_SEP_CHAR, ROOT_PATH};
use thiserror::Error;

/// Outcome of resolving a client path against the session's sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path shown to the client, always rooted at `/`.
    pub virtual_path: String,
    /// Sandbox root + virtual path.
    pub absolute_path: String,
    /// Directory holding `absolute_path`.
    pub parent_path: String,
    /// Last component of `absolute_path`.
    pub entry_name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path climbs above its starting directory: {0}")]
    Traversal(String),

    #[error("Path exceeds {0} bytes")]
    TooLong(usize),
}

/// Maps `new_path` onto the sandbox rooted at `base_path`, relative to the
/// client's working directory `current_dir`.
///
/// Absolute tokens replace the working directory, `.` keeps it, `..` climbs
/// one level (never above `/`), anything else is appended to it. The result
/// never leaves `base_path`: a `..` component inside a longer token is
/// refused, as is any path longer than `max_len`.
pub fn resolve_path(
    base_path: &str,
    current_dir: &str,
    new_path: &str,
    max_len: usize,
) -> Result<ResolvedPath, PathError> {
    let mut new_path = if new_path.is_empty() {
        CURRENT_PATH
    } else {
        new_path
    };

    if new_path != ROOT_PATH {
        if let Some(stripped) = new_path.strip_suffix(PATH_SEP_CHAR) {
            new_path = stripped;
        }
    }

    if new_path != PARENT_PATH && new_path.split(PATH_SEP_CHAR).any(|c| c == PARENT_PATH) {
        return Err(PathError::Traversal(new_path.to_string()));
    }

    let virtual_path = if new_path.starts_with(PATH_SEP_CHAR) {
        new_path.to_string()
    } else if new_path == CURRENT_PATH {
        current_dir.to_string()
    } else if new_path == PARENT_PATH {
        parent_of(current_dir).to_string()
    } else if current_dir == ROOT_PATH {
        format!("{}{}", current_dir, new_path)
    } else {
        format!("{}{}{}", current_dir, PATH_SEP_CHAR, new_path)
    };

    let absolute_path = if base_path == ROOT_PATH {
        virtual_path.clone()
    } else {
        format!("{}{}", base_path, virtual_path)
    };

    if virtual_path.len() > max_len || absolute_path.len() > max_len {
        return Err(PathError::TooLong(max_len));
    }

    let (parent_path, entry_name) = match absolute_path.rfind(PATH_SEP_CHAR) {
        Some(0) => (ROOT_PATH.to_string(), absolute_path[1..].to_string()),
        Some(idx) => (
            absolute_path[..idx].to_string(),
            absolute_path[idx + 1..].to_string(),
        ),
        None => (String::new(), absolute_path.clone()),
    };

    Ok(ResolvedPath {
        virtual_path,
        absolute_path,
        parent_path,
        entry_name,
    })
}

/// `path` without its last component; `/` stays `/`.
fn parent_of(path: &str) -> &str {
    match path.rfind(PATH_SEP_CHAR) {
        Some(0) | None => ROOT_PATH,
        Some(idx) => &path[..idx],
    }
}

/// Rewrites protocol separators into the filesystem's own.
pub fn to_fs_path(path: &str, separator: char) -> String {
    if separator == PATH_SEP_CHAR {
        path.to_string()
    } else {
        path.replace(PATH_SEP_CHAR, &separator.to_string())
    }
}

/// Splits a command line into its upper-cased command word and the
/// remaining arguments.
pub fn split_command(line: &str) -> (String, &str) {
    let line = line.trim_start();
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    let (word, rest) = line.split_at(end);
    (word.to_ascii_uppercase(), rest.trim())
}

/// Next whitespace-delimited token of `args`, and what follows it.
pub fn find_arg(args: &str) -> (&str, &str) {
    let args = args.trim_start();
    let end = args.find(char::is_whitespace).unwrap_or(args.len());
    let (arg, rest) = args.split_at(end);
    (arg, rest.trim_start())
}

/// File name argument: leading whitespace skipped, then every printable
/// character, spaces included.
pub fn find_file_name(args: &str) -> &str {
    let args = args.trim_start();
    let end = args.find(char::is_control).unwrap_or(args.len());
    &args[..end]
}

/// Truncates to at most `max` bytes without splitting a character.
pub fn truncate_to(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
