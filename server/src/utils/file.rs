//! Path helpers

use std::path::PathBuf;

/// Turn a user-supplied path into an absolute one.
///
/// `~` and `~/...` resolve against the home directory; other relative paths
/// resolve against the working directory. An empty string yields the working
/// directory itself.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        cwd().join(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(expand_path("/etc/podtag.json"), PathBuf::from("/etc/podtag.json"));
    }

    #[test]
    fn test_relative_path_joins_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("./podtag.json"), cwd.join("./podtag.json"));
        assert_eq!(expand_path("conf/podtag.json"), cwd.join("conf/podtag.json"));
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/.podtag/podtag.json"), home.join(".podtag/podtag.json"));
        }
    }

    #[test]
    fn test_tilde_user_form_is_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("~other"), cwd.join("~other"));
    }

    #[test]
    fn test_empty_and_whitespace() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path(""), cwd);
        assert_eq!(expand_path("  /tmp/x  "), PathBuf::from("/tmp/x"));
    }
}
