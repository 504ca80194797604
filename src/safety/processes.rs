//! Running-application detection.
//!
//! A cleaner may list executables in its `running` field. While one of
//! them is running, that cleaner's options are skipped so we never delete
//! files out from under a live application.

use std::collections::HashSet;

use sysinfo::System;

/// Answers whether a named application is running.
pub trait ProcessProbe: Send + Sync {
    /// Whether a process with this executable name is running.
    fn is_running(&self, name: &str) -> bool;
}

fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_suffix(".exe")
        .map_or(lower.clone(), ToString::to_string)
}

/// Probe backed by the `sysinfo` process table, captured at construction.
#[derive(Debug, Clone, Default)]
pub struct SysinfoProbe {
    names: HashSet<String>,
}

impl SysinfoProbe {
    /// Capture the current process list.
    #[must_use]
    pub fn capture() -> Self {
        let mut system = System::new();
        system.refresh_processes();

        let names: HashSet<String> = system
            .processes()
            .values()
            .flat_map(|process| {
                let exe_name = process
                    .exe()
                    .and_then(|p| p.file_name())
                    .map(|n| normalize_name(&n.to_string_lossy()));
                std::iter::once(normalize_name(process.name())).chain(exe_name)
            })
            .collect();

        log::debug!("Captured {} running process name(s)", names.len());
        Self { names }
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_running(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }
}

/// Probe with a fixed answer set.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    names: HashSet<String>,
}

impl StaticProbe {
    /// A probe that reports the given names as running.
    #[must_use]
    pub fn running<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|n| normalize_name(n.as_ref())).collect(),
        }
    }

    /// A probe that reports nothing running.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

impl ProcessProbe for StaticProbe {
    fn is_running(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }
}
