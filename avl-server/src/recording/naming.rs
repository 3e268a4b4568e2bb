//! File naming for exported tracks.

use std::collections::HashSet;

/// Longest base name we hand to the filesystem
const MAX_BASE_NAME_LEN: usize = 64;

/// Turn a device identifier into a base name that is safe to use as a file
/// name inside the export directory.
///
/// ASCII letters, digits, `-` and `_` are kept, everything else becomes `_`.
/// Leading dots cannot survive, so names like `..` never escape the directory.
pub fn safe_base_name(device_id: &str) -> String {
    let name: String = device_id
        .chars()
        .take(MAX_BASE_NAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        "device".to_string()
    } else {
        name
    }
}

/// Like [`safe_base_name`], but never returns a name already in `used`.
///
/// A clash gets a numeric suffix (`a_b-2`, `a_b-3`, ...). The returned name is
/// added to `used`.
pub fn unique_base_name(device_id: &str, used: &mut HashSet<String>) -> String {
    let base = safe_base_name(device_id);
    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(name.clone());
    name
}
