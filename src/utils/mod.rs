pub mod auth;

pub use auth::{
    create_token, hash_password, verify_password, verify_token, Claims, BUILTIN_ADMIN_SUBJECT,
};

/// Trims the value and drops it when nothing is left.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::non_empty;

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_empty(Some("  Main  ".into())), Some("Main".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
