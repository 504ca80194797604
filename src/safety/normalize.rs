//! Path normalization for safety comparisons.
//!
//! Exclusion rules and candidates may spell the same name differently:
//! macOS hands out NFD file names while configuration files are usually NFC,
//! and Windows compares names case-insensitively. Every comparison the
//! safety filter makes goes through [`comparison_path`] first.
//!
//! ```
//! use cleanbit::safety::normalize::{is_within, same_path};
//! use std::path::Path;
//!
//! let nfc = Path::new("/data/café");
//! let nfd = Path::new("/data/cafe\u{0301}");
//! assert!(same_path(nfc, nfd));
//! assert!(is_within(Path::new("/data/cafe\u{0301}/x.tmp"), nfc));
//! ```

use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC.
#[must_use]
pub fn nfc(s: &str) -> String {
    if unicode_normalization::is_nfc(s) {
        s.to_string()
    } else {
        s.nfc().collect()
    }
}

/// The form of `path` used for comparisons.
///
/// NFC everywhere, plus case folding on Windows. Paths that are not valid
/// UTF-8 are returned unchanged.
#[must_use]
pub fn comparison_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => {
            let normalized = nfc(s);
            if cfg!(windows) {
                PathBuf::from(normalized.to_lowercase())
            } else {
                PathBuf::from(normalized)
            }
        }
        None => path.to_path_buf(),
    }
}

/// Whether two paths name the same location after normalization.
#[must_use]
pub fn same_path(a: &Path, b: &Path) -> bool {
    comparison_path(a) == comparison_path(b)
}

/// Whether `path` is `ancestor` or lies below it, compared component-wise.
#[must_use]
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    comparison_path(path).starts_with(comparison_path(ancestor))
}
