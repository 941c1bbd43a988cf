//! Path and pattern helpers shared by the walker, gate, and cache.
//!
//! `glob_match` is carried over near-verbatim from the teacher's
//! `engine::tools`, as is `running_as_root`. `is_os_hidden_file` is
//! generalized from the teacher's fixed OS-junk list to the spec's general
//! "dot-prefixed basename is hidden" rule (spec §4.1), keeping the
//! dot-less Windows housekeeping names as an additional case.

use std::path::Path;

/// Simple glob pattern matching (supports `*` and `?`).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.strip_prefix('!').unwrap_or(pattern);

    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars().peekable();

    while let Some(&p) = pattern_chars.peek() {
        match p {
            '*' => {
                pattern_chars.next();
                if pattern_chars.peek().is_none() {
                    return true;
                }
                while text_chars.peek().is_some() {
                    if glob_match(
                        &pattern_chars.clone().collect::<String>(),
                        &text_chars.clone().collect::<String>(),
                    ) {
                        return true;
                    }
                    text_chars.next();
                }
                return false;
            }
            '?' => {
                pattern_chars.next();
                if text_chars.next().is_none() {
                    return false;
                }
            }
            _ => {
                pattern_chars.next();
                if text_chars.next() != Some(p) {
                    return false;
                }
            }
        }
    }

    text_chars.peek().is_none()
}

/// True if any pattern in `patterns` matches the path's basename or full
/// path string.
pub fn matches_any(patterns: &[String], path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let path_str = path.to_str().unwrap_or("");
    patterns
        .iter()
        .any(|p| glob_match(p, name) || glob_match(p, path_str))
}

/// Hidden entries: any dot-prefixed basename (spec §4.1 — covers ordinary
/// dotfiles like `.bashrc` and `.git` as well as `.DS_Store`-style OS junk),
/// plus the handful of Windows housekeeping names that don't follow the dot
/// convention.
pub fn is_os_hidden_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return true;
    }
    matches!(name, "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" | "$RECYCLE.BIN")
}

/// True if the process is running with effective uid 0.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

/// Normalize a path to forward slashes for portable storage/display.
pub fn path_to_portable_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_and_question_mark() {
        assert!(glob_match("*.log", "run.log"));
        assert!(!glob_match("*.log", "run.txt"));
        assert!(glob_match("core.?", "core.1"));
        assert!(!glob_match("core.?", "core.12"));
    }

    #[test]
    fn hidden_file_detection() {
        assert!(is_os_hidden_file(Path::new("/x/.DS_Store")));
        assert!(is_os_hidden_file(Path::new("/x/._resource")));
        assert!(is_os_hidden_file(Path::new("/x/.bashrc")));
        assert!(is_os_hidden_file(Path::new("/x/.git")));
        assert!(is_os_hidden_file(Path::new("/x/Thumbs.db")));
        assert!(!is_os_hidden_file(Path::new("/x/real.txt")));
    }
}
