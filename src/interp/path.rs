//! Command Path Lookup
//!
//! Resolves a command name against `$PATH`. Names containing a slash bypass
//! the search.

use crate::shell::state::ShellState;

fn accessible(path: &str, exec: bool) -> bool {
    let Ok(c_path) = std::ffi::CString::new(path) else {
        return false;
    };
    let mode = if exec { libc::X_OK } else { libc::R_OK };
    unsafe { libc::access(c_path.as_ptr(), mode) != -1 }
}

/// Find `file` on `$PATH`. Returns the full path, or None when nothing
/// accessible matches.
pub fn expand_path(state: &ShellState, file: &str, exec: bool) -> Option<String> {
    if file.contains('/') {
        return Some(file.to_string());
    }

    let pathe = state.env_get_value("PATH")?.to_string();
    for basedir in pathe.split(':') {
        if basedir.is_empty() {
            continue;
        }
        let path = if basedir.ends_with('/') {
            format!("{}{}", basedir, file)
        } else {
            format!("{}/{}", basedir, file)
        };
        if accessible(&path, exec) {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::VAR_ATTRIB_NONE;

    #[test]
    fn test_slash_bypasses_search() {
        let state = ShellState::new(vec!["test-sh".to_string()]);
        assert_eq!(expand_path(&state, "./foo", true), Some("./foo".to_string()));
        assert_eq!(expand_path(&state, "/bin/sh", true), Some("/bin/sh".to_string()));
    }

    #[test]
    fn test_path_search_finds_sh() {
        let mut state = ShellState::new(vec!["test-sh".to_string()]);
        state
            .env_set("PATH", "/nonexistent:/bin:/usr/bin", VAR_ATTRIB_NONE)
            .unwrap();
        let found = expand_path(&state, "sh", true);
        assert!(found.is_some(), "sh not found on /bin:/usr/bin");
        assert!(found.unwrap().ends_with("/sh"));
    }

    #[test]
    fn test_missing_command() {
        let mut state = ShellState::new(vec!["test-sh".to_string()]);
        state.env_set("PATH", "/bin", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand_path(&state, "definitely-not-a-command-xyzzy", true), None);
    }
}
