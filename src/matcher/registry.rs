//! Windows registry backend.
//!
//! On Windows keys and values are resolved and deleted through `winreg`.
//! Everywhere else the backend is absent: lookups resolve to nothing and
//! deletions report `Unsupported`.

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Whether this build can touch the registry at all.
pub const AVAILABLE: bool = cfg!(windows);

/// Registry root key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    /// `HKEY_CLASSES_ROOT`
    ClassesRoot,
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
    /// `HKEY_USERS`
    Users,
    /// `HKEY_CURRENT_CONFIG`
    CurrentConfig,
}

impl Hive {
    /// Short name, e.g. `HKCU`.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKCR",
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Hive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HKCR" | "HKEY_CLASSES_ROOT" => Ok(Self::ClassesRoot),
            "HKCU" | "HKEY_CURRENT_USER" => Ok(Self::CurrentUser),
            "HKLM" | "HKEY_LOCAL_MACHINE" => Ok(Self::LocalMachine),
            "HKU" | "HKEY_USERS" => Ok(Self::Users),
            "HKCC" | "HKEY_CURRENT_CONFIG" => Ok(Self::CurrentConfig),
            _ => Err(format!("unknown registry hive '{s}'")),
        }
    }
}

impl Serialize for Hive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether the key exists.
///
/// # Errors
///
/// Returns an error for failures other than the key being absent.
pub fn key_exists(hive: Hive, key_path: &str) -> io::Result<bool> {
    backend::key_exists(hive, key_path)
}

/// Whether the value exists under the key.
///
/// # Errors
///
/// Returns an error for failures other than the key or value being absent.
pub fn value_exists(hive: Hive, key_path: &str, value_name: &str) -> io::Result<bool> {
    backend::value_exists(hive, key_path, value_name)
}

/// Delete a key. Without `recursive`, a key with subkeys is left alone.
///
/// # Errors
///
/// Returns the underlying error, or `Unsupported` off Windows.
pub fn delete_key(hive: Hive, key_path: &str, recursive: bool) -> io::Result<()> {
    backend::delete_key(hive, key_path, recursive)
}

/// Delete a single value.
///
/// # Errors
///
/// Returns the underlying error, or `Unsupported` off Windows.
pub fn delete_value(hive: Hive, key_path: &str, value_name: &str) -> io::Result<()> {
    backend::delete_value(hive, key_path, value_name)
}

#[cfg(windows)]
mod backend {
    use std::io;

    use winreg::enums::{
        HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
        HKEY_USERS, KEY_READ, KEY_SET_VALUE,
    };
    use winreg::RegKey;

    use super::Hive;

    fn predef(hive: Hive) -> RegKey {
        RegKey::predef(match hive {
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }

    fn absent_is_false(result: io::Result<()>) -> io::Result<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn key_exists(hive: Hive, key_path: &str) -> io::Result<bool> {
        absent_is_false(
            predef(hive)
                .open_subkey_with_flags(key_path, KEY_READ)
                .map(|_| ()),
        )
    }

    pub fn value_exists(hive: Hive, key_path: &str, value_name: &str) -> io::Result<bool> {
        let key = match predef(hive).open_subkey_with_flags(key_path, KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        absent_is_false(key.get_raw_value(value_name).map(|_| ()))
    }

    pub fn delete_key(hive: Hive, key_path: &str, recursive: bool) -> io::Result<()> {
        let root = predef(hive);
        if recursive {
            root.delete_subkey_all(key_path)
        } else {
            root.delete_subkey(key_path)
        }
    }

    pub fn delete_value(hive: Hive, key_path: &str, value_name: &str) -> io::Result<()> {
        predef(hive)
            .open_subkey_with_flags(key_path, KEY_SET_VALUE)?
            .delete_value(value_name)
    }
}

#[cfg(not(windows))]
mod backend {
    use std::io;

    use super::Hive;

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "the registry is not available on this platform",
        )
    }

    pub fn key_exists(_hive: Hive, _key_path: &str) -> io::Result<bool> {
        Ok(false)
    }

    pub fn value_exists(_hive: Hive, _key_path: &str, _value_name: &str) -> io::Result<bool> {
        Ok(false)
    }

    pub fn delete_key(_hive: Hive, _key_path: &str, _recursive: bool) -> io::Result<()> {
        Err(unsupported())
    }

    pub fn delete_value(_hive: Hive, _key_path: &str, _value_name: &str) -> io::Result<()> {
        Err(unsupported())
    }
}
