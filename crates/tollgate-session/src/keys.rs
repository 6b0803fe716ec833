//! Session key namespacing.

/// Prefix applied to every session record key.
pub const SESSION_KEY_PREFIX: &str = "login:token:";

/// Store key holding the canonical token for `subject`.
pub fn session_key(subject: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{subject}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced() {
        assert_eq!(session_key("alice"), "login:token:alice");
    }

    #[test]
    fn distinct_subjects_get_distinct_keys() {
        assert_ne!(session_key("alice"), session_key("alice2"));
    }
}
