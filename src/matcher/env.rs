//! Host environment used to expand rule patterns.
//!
//! Patterns never read the process environment directly. The engine is
//! given a [`HostEnvironment`] snapshot, which keeps expansion deterministic
//! and lets tests point `~` at a temporary directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::MatchError;

/// Home directory and variables available to pattern expansion.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    home: Option<PathBuf>,
    vars: HashMap<String, String>,
}

impl HostEnvironment {
    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        let mut env = Self {
            home,
            vars: HashMap::new(),
        };
        for (name, value) in std::env::vars() {
            env.insert(&name, value);
        }
        env.fill_defaults();
        env
    }

    /// An environment with only a home directory and the derived defaults.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let mut env = Self {
            home: Some(home.into()),
            vars: HashMap::new(),
        };
        env.fill_defaults();
        env
    }

    /// Set a variable, replacing any previous value.
    #[must_use]
    pub fn with_var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// The home directory, if known.
    #[must_use]
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Look up a variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(&Self::key(name)).map(String::as_str)
    }

    fn key(name: &str) -> String {
        if cfg!(windows) {
            name.to_ascii_uppercase()
        } else {
            name.to_string()
        }
    }

    fn insert(&mut self, name: &str, value: String) {
        self.vars.insert(Self::key(name), value);
    }

    fn fill_defaults(&mut self) {
        let Some(home) = self.home.clone() else {
            return;
        };
        let home_str = home.to_string_lossy().into_owned();
        self.vars
            .entry(Self::key("HOME"))
            .or_insert_with(|| home_str.clone());

        if cfg!(unix) {
            for (name, rel) in [
                ("XDG_CACHE_HOME", ".cache"),
                ("XDG_CONFIG_HOME", ".config"),
                ("XDG_DATA_HOME", ".local/share"),
                ("XDG_STATE_HOME", ".local/state"),
            ] {
                self.vars
                    .entry(name.to_string())
                    .or_insert_with(|| home.join(rel).to_string_lossy().into_owned());
            }
        }
    }

    /// Expand `~` and variables in a glob pattern.
    ///
    /// Substituted values are glob-escaped, so a home directory containing
    /// `[` does not change the meaning of the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::UnresolvedVariable`] for an undefined variable,
    /// or for `~` when no home directory is known.
    pub fn expand(&self, pattern: &str) -> Result<String, MatchError> {
        self.expand_with(pattern, true)
    }

    /// Expand `~` and variables in plain text such as command arguments.
    ///
    /// # Errors
    ///
    /// Same as [`HostEnvironment::expand`].
    pub fn expand_plain(&self, text: &str) -> Result<String, MatchError> {
        self.expand_with(text, false)
    }

    fn expand_with(&self, text: &str, escape: bool) -> Result<String, MatchError> {
        let subst = |value: &str| {
            if escape {
                glob::Pattern::escape(value)
            } else {
                value.to_string()
            }
        };

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        if let Some(after) = rest.strip_prefix('~') {
            if after.is_empty() || after.starts_with('/') || after.starts_with('\\') {
                let home = self
                    .home
                    .as_ref()
                    .ok_or_else(|| MatchError::UnresolvedVariable("~".to_string()))?;
                out.push_str(&subst(&home.to_string_lossy()));
                rest = after;
            }
        }

        while let Some(pos) = rest.find(&['$', '%'][..]) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            let Some((name, consumed)) = parse_reference(tail) else {
                out.push_str(&tail[..1]);
                rest = &tail[1..];
                continue;
            };

            let value = self
                .var(name)
                .ok_or_else(|| MatchError::UnresolvedVariable(name.to_string()))?;
            out.push_str(&subst(value));
            rest = &tail[consumed..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// A pattern matching exactly the path `text`.
///
/// Glob metacharacters are escaped, and so are the `$` and `%` sigils,
/// which would otherwise be read as variable references during expansion.
#[must_use]
pub fn literal_pattern(text: &str) -> String {
    let escaped = glob::Pattern::escape(text);
    let mut out = String::with_capacity(escaped.len());
    for c in escaped.chars() {
        match c {
            '$' | '%' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Parse `${NAME}`, `$NAME` or `%NAME%` at the start of `text`.
///
/// Returns the name and the number of bytes consumed.
fn parse_reference(text: &str) -> Option<(&str, usize)> {
    if let Some(braced) = text.strip_prefix("${") {
        let end = braced.find('}')?;
        let name = &braced[..end];
        return is_identifier(name).then_some((name, end + 3));
    }

    if let Some(bare) = text.strip_prefix('$') {
        let len = bare
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())))
            .map_or(bare.len(), |(i, _)| i);
        return (len > 0).then(|| (&bare[..len], len + 1));
    }

    if let Some(percent) = text.strip_prefix('%') {
        let end = percent.find('%')?;
        let name = &percent[..end];
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')'));
        return valid.then_some((name, end + 2));
    }

    None
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
