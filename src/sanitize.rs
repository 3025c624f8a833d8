//! Filename sanitization for client-supplied names.
//!
//! The server never trusts a remote filename: whatever arrives is flattened
//! to a bare, traversal-free name before it touches the filesystem.

// Both separator styles are replaced regardless of host OS.
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Maps an arbitrary remote string to a safe bare filename: separators
/// become spaces, whitespace runs collapse to single underscores, and
/// leading/trailing underscores and dots are stripped. May return an empty
/// string; callers treat that as a name that can never exist.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .trim_matches(|c| c == '_' || c == '.')
        .to_string()
}
