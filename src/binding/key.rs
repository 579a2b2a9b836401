//! Namespace joining for remote keys.

/// Join a local key onto an optional namespace.
///
/// Exactly one `/` separates the two parts; an absent or empty namespace
/// leaves the key untouched.
pub fn join(namespace: Option<&str>, key: &str) -> String {
    match namespace
        .map(|ns| ns.trim_end_matches('/'))
        .filter(|ns| !ns.is_empty())
    {
        Some(ns) => format!("{}/{}", ns, key.trim_start_matches('/')),
        None => key.to_string(),
    }
}
