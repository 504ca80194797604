//! Exclusion rules.
//!
//! Three tiers of protection, checked in this order:
//!
//! 1. **Critical roots**: a candidate equal to a critical root, or an
//!    ancestor of one, is denied. `/usr` cannot be deleted, `/usr/local/x`
//!    still can unless another rule applies.
//! 2. **Protected subtrees**: a candidate at or below one is denied.
//! 3. **User exclusions**: literal paths (the path and everything below it)
//!    and glob patterns. Exclusion globs let `*` cross directory
//!    separators, so `~/keep/*` covers the whole tree.
//!
//! The set is built once and never changes while an engine holds it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::normalize::{comparison_path, is_within, nfc};
use crate::matcher::{HostEnvironment, Hive, MatchError};

/// Errors building an exclusion set.
#[derive(Debug, Error)]
pub enum ExclusionError {
    /// The rule is not a valid glob.
    #[error("invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The rule references an undefined variable.
    #[error("exclusion '{rule}': {source}")]
    Expansion {
        rule: String,
        #[source]
        source: MatchError,
    },
}

#[derive(Debug, Clone)]
enum UserRule {
    Path(PathBuf),
    Glob {
        source: String,
        pattern: glob::Pattern,
    },
}

/// Immutable set of protected locations.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    critical: Vec<PathBuf>,
    protected: Vec<PathBuf>,
    user: Vec<UserRule>,
    registry: Vec<(Hive, String)>,
}

impl ExclusionSet {
    /// A set with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in protections for this platform.
    #[must_use]
    pub fn builtin(env: &HostEnvironment) -> Self {
        let mut set = Self::default();

        if cfg!(unix) {
            for root in [
                "/", "/bin", "/boot", "/dev", "/etc", "/home", "/lib", "/lib32", "/lib64",
                "/media", "/mnt", "/opt", "/proc", "/root", "/run", "/sbin", "/srv", "/sys",
                "/tmp", "/usr", "/usr/local", "/usr/share", "/var", "/var/cache", "/var/log",
                "/var/tmp", "/Applications", "/Library", "/System", "/Users",
            ] {
                set.critical.push(PathBuf::from(root));
            }
            for subtree in [
                "/bin", "/boot", "/dev", "/etc", "/lib", "/lib32", "/lib64", "/proc", "/sbin",
                "/sys", "/usr/bin", "/usr/lib", "/usr/lib64", "/usr/libexec", "/usr/sbin",
                "/System",
            ] {
                set.protected.push(PathBuf::from(subtree));
            }
        }

        if cfg!(windows) {
            for name in [
                "SystemDrive",
                "SystemRoot",
                "ProgramFiles",
                "ProgramFiles(x86)",
                "ProgramData",
                "APPDATA",
                "LOCALAPPDATA",
            ] {
                if let Some(value) = env.var(name) {
                    let mut root = PathBuf::from(value);
                    if name == "SystemDrive" {
                        root.push("\\");
                    }
                    set.critical.push(root);
                }
            }
            if let Some(system_root) = env.var("SystemRoot") {
                for sub in ["System32", "SysWOW64", "WinSxS"] {
                    set.protected.push(Path::new(system_root).join(sub));
                }
            }
        }

        if let Some(home) = env.home() {
            set.critical.push(home.to_path_buf());
            for dir in [
                ".cache",
                ".config",
                ".local",
                ".local/share",
                "Desktop",
                "Documents",
                "Downloads",
                "Music",
                "Pictures",
                "Videos",
            ] {
                set.critical.push(home.join(dir));
            }
            for dir in [".ssh", ".gnupg"] {
                set.protected.push(home.join(dir));
            }
        }

        for (hive, prefix) in [
            (Hive::LocalMachine, "SAM"),
            (Hive::LocalMachine, "SECURITY"),
            (Hive::LocalMachine, "SYSTEM"),
            (Hive::LocalMachine, "HARDWARE"),
            (
                Hive::LocalMachine,
                "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Winlogon",
            ),
            (
                Hive::CurrentUser,
                "Software\\Microsoft\\Windows\\CurrentVersion\\Policies",
            ),
        ] {
            set.registry.push((hive, prefix.to_string()));
        }

        set
    }

    /// Add a critical root.
    #[must_use]
    pub fn with_critical_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.critical.push(path.into());
        self
    }

    /// Add a protected subtree.
    #[must_use]
    pub fn with_protected_subtree(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected.push(path.into());
        self
    }

    /// Add user exclusions, expanding `~` and variables.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid glob or an undefined variable.
    pub fn with_user_rules<I, S>(mut self, rules: I, env: &HostEnvironment) -> Result<Self, ExclusionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            self.add_user_rule(rule.as_ref(), env)?;
        }
        Ok(self)
    }

    /// Add one user exclusion.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid glob or an undefined variable.
    pub fn add_user_rule(&mut self, rule: &str, env: &HostEnvironment) -> Result<(), ExclusionError> {
        let expansion_error = |source| ExclusionError::Expansion {
            rule: rule.to_string(),
            source,
        };

        if rule.contains(&['*', '?', '['][..]) {
            let expanded = env.expand(rule).map_err(expansion_error)?;
            let normalized = comparison_path(Path::new(&expanded));
            let pattern = glob::Pattern::new(&normalized.to_string_lossy()).map_err(|e| {
                ExclusionError::InvalidPattern {
                    pattern: rule.to_string(),
                    message: e.to_string(),
                }
            })?;
            self.user.push(UserRule::Glob {
                source: rule.to_string(),
                pattern,
            });
        } else {
            let expanded = env.expand_plain(rule).map_err(expansion_error)?;
            self.user.push(UserRule::Path(PathBuf::from(nfc(&expanded))));
        }
        log::debug!("Added user exclusion: {}", rule);
        Ok(())
    }

    /// Number of user exclusions.
    #[must_use]
    pub fn user_rule_count(&self) -> usize {
        self.user.len()
    }

    /// Reason `path` must not be removed, if any.
    #[must_use]
    pub fn check_delete(&self, path: &Path) -> Option<String> {
        if let Some(root) = self.critical.iter().find(|root| is_within(root, path)) {
            return Some(if comparison_path(root) == comparison_path(path) {
                format!("{} is a critical system location", path.display())
            } else {
                format!("{} contains critical location {}", path.display(), root.display())
            });
        }
        self.check_write(path)
    }

    /// Reason `path` must not be written below, if any.
    ///
    /// Used for free space wiping, which creates files under a directory
    /// without removing anything that already exists.
    #[must_use]
    pub fn check_write(&self, path: &Path) -> Option<String> {
        if let Some(subtree) = self.protected.iter().find(|p| is_within(path, p)) {
            return Some(format!("inside protected {}", subtree.display()));
        }
        self.check_user(path)
    }

    /// Reason `path` is covered by a user exclusion, if any.
    #[must_use]
    pub fn check_user(&self, path: &Path) -> Option<String> {
        let normalized = comparison_path(path);
        let options = glob::MatchOptions {
            case_sensitive: !cfg!(windows),
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        self.user.iter().find_map(|rule| match rule {
            UserRule::Path(excluded) if is_within(path, excluded) => {
                Some(format!("user exclusion {}", excluded.display()))
            }
            UserRule::Glob { source, pattern } if pattern.matches_path_with(&normalized, options) => {
                Some(format!("user exclusion {source}"))
            }
            _ => None,
        })
    }

    /// Reason a registry key must not be touched, if any.
    ///
    /// Hive roots and their immediate children are always protected.
    #[must_use]
    pub fn check_registry(&self, hive: Hive, key_path: &str) -> Option<String> {
        let components = registry_components(key_path);
        if components.len() <= 1 {
            return Some(format!("{hive}\\{key_path} is a top-level registry key"));
        }

        self.registry.iter().find_map(|(protected_hive, prefix)| {
            let prefix = registry_components(prefix);
            (*protected_hive == hive && components.starts_with(&prefix)).then(|| {
                format!("inside protected registry key {}\\{}", hive, prefix.join("\\"))
            })
        })
    }
}

fn registry_components(key_path: &str) -> Vec<String> {
    key_path
        .split('\\')
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> HostEnvironment {
        HostEnvironment::new("/home/alice")
    }

    #[cfg(unix)]
    #[test]
    fn test_critical_roots_and_ancestors_denied() {
        let set = ExclusionSet::builtin(&env());
        assert!(set.check_delete(Path::new("/")).is_some());
        assert!(set.check_delete(Path::new("/usr")).is_some());
        assert!(set.check_delete(Path::new("/home/alice")).is_some());
        assert!(set.check_delete(Path::new("/home")).is_some());
        assert!(set.check_delete(Path::new("/home/alice/Documents")).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_contents_of_critical_roots_allowed() {
        let set = ExclusionSet::builtin(&env());
        assert!(set.check_delete(Path::new("/var/cache/apt/archives/x.deb")).is_none());
        assert!(set.check_delete(Path::new("/home/alice/.cache/thumbnails")).is_none());
        assert!(set.check_delete(Path::new("/tmp/session.lock")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_protected_subtrees_denied() {
        let set = ExclusionSet::builtin(&env());
        assert!(set.check_delete(Path::new("/etc/passwd")).is_some());
        assert!(set.check_delete(Path::new("/usr/bin/ls")).is_some());
        assert!(set.check_delete(Path::new("/home/alice/.ssh/id_ed25519")).is_some());
        assert!(set.check_write(Path::new("/proc/1")).is_some());
        assert!(set.check_write(Path::new("/")).is_none());
    }

    #[test]
    fn test_user_path_rule_covers_subtree() {
        let set = ExclusionSet::empty()
            .with_user_rules(["~/keep"], &env())
            .unwrap();
        assert!(set.check_delete(Path::new("/home/alice/keep")).is_some());
        assert!(set.check_delete(Path::new("/home/alice/keep/a/b.txt")).is_some());
        assert!(set.check_delete(Path::new("/home/alice/keeper")).is_none());
    }

    #[test]
    fn test_user_glob_rule() {
        let set = ExclusionSet::empty()
            .with_user_rules(["/data/*.db"], &env())
            .unwrap();
        assert!(set.check_delete(Path::new("/data/history.db")).is_some());
        assert!(set.check_delete(Path::new("/data/history.txt")).is_none());
    }

    #[test]
    fn test_user_rules_are_unicode_normalized() {
        let set = ExclusionSet::empty()
            .with_user_rules(["/data/cafe\u{0301}"], &env())
            .unwrap();
        assert!(set.check_delete(Path::new("/data/café/menu.txt")).is_some());
    }

    #[test]
    fn test_invalid_glob_rule_rejected() {
        let result = ExclusionSet::empty().with_user_rules(["/data/[oops"], &env());
        assert!(matches!(result, Err(ExclusionError::InvalidPattern { .. })));
    }

    #[test]
    fn test_registry_protection() {
        let set = ExclusionSet::builtin(&env());
        assert!(set.check_registry(Hive::CurrentUser, "Software").is_some());
        assert!(set.check_registry(Hive::LocalMachine, "SYSTEM\\CurrentControlSet").is_some());
        assert!(set
            .check_registry(Hive::CurrentUser, "Software\\Vendor\\App\\Recent")
            .is_none());
    }

    #[test]
    fn test_empty_set_allows_everything_but_registry_roots() {
        let set = ExclusionSet::empty();
        assert!(set.check_delete(Path::new("/anything")).is_none());
        assert!(set.check_registry(Hive::Users, "").is_some());
    }
}
