//! Placeholder substitution for command templates
//!
//! A template may contain any of the fixed tokens below. There is no escaping:
//! a literal occurrence of a token is always treated as a placeholder.

/// Recognized placeholder tokens
pub const PLACEHOLDERS: [&str; 4] = ["{1}", "{arg}", "%1%", "%arg%"];

/// Whether `text` contains at least one placeholder token
pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDERS.iter().any(|token| text.contains(token))
}

/// Replace every placeholder token in `template` with `arg`
///
/// An empty `arg` leaves the template untouched.
pub fn resolve(template: &str, arg: &str) -> String {
    if arg.is_empty() {
        return template.to_string();
    }

    PLACEHOLDERS
        .iter()
        .fold(template.to_string(), |acc, token| acc.replace(token, arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_argument() {
        assert_eq!(resolve("open {1}", "report.txt"), "open report.txt");
    }

    #[test]
    fn test_resolve_with_empty_argument_is_identity() {
        assert_eq!(resolve("open {1}", ""), "open {1}");
    }

    #[test]
    fn test_resolve_without_tokens_is_identity() {
        assert_eq!(resolve("dir /s", "anything"), "dir /s");
    }

    #[test]
    fn test_resolve_replaces_every_token_kind() {
        assert_eq!(
            resolve("{1} {arg} %1% %arg% {1}", "x"),
            "x x x x x"
        );
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("ping %arg%"));
        assert!(has_placeholder("code {1}"));
        assert!(!has_placeholder("code {2}"));
        assert!(!has_placeholder("echo %PATH%"));
    }
}
