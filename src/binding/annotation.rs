//! Binding annotation grammar.
//!
//! ```text
//! <localKey>[:<handler1>[,<handler2>...]|*]
//! ```
//!
//! `*` marks the key as watched without dispatching to a named handler.

use std::str::FromStr;
use thiserror::Error;

const WILDCARD: &str = "*";

/// A parsed binding annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Key relative to the namespace.
    pub key: String,
    /// Handler names in declaration order.
    pub handlers: Vec<String>,
    /// The `*` token was present.
    pub wildcard: bool,
}

/// A binding annotation that cannot be used. The field is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("binding annotation {0:?} has an empty key")]
    EmptyKey(String),

    #[error("binding annotation {0:?} has more than one ':' separator")]
    Malformed(String),
}

impl FromStr for Annotation {
    type Err = AnnotationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (key, handlers) = match raw.split_once(':') {
            Some((_, rest)) if rest.contains(':') => {
                return Err(AnnotationError::Malformed(raw.to_string()));
            }
            Some((key, rest)) => (key.trim(), rest),
            None => (raw.trim(), ""),
        };

        if key.is_empty() {
            return Err(AnnotationError::EmptyKey(raw.to_string()));
        }

        let mut annotation = Annotation {
            key: key.to_string(),
            handlers: Vec::new(),
            wildcard: false,
        };

        for token in handlers.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == WILDCARD {
                annotation.wildcard = true;
            } else {
                annotation.handlers.push(token.to_string());
            }
        }

        Ok(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key() {
        let a: Annotation = "api-url".parse().unwrap();
        assert_eq!(a.key, "api-url");
        assert!(a.handlers.is_empty());
        assert!(!a.wildcard);
    }

    #[test]
    fn test_handlers_keep_order() {
        let a: Annotation = "api-port:on_port, audit".parse().unwrap();
        assert_eq!(a.key, "api-port");
        assert_eq!(a.handlers, vec!["on_port", "audit"]);
        assert!(!a.wildcard);
    }

    #[test]
    fn test_wildcard_and_empty_tokens() {
        let a: Annotation = "token:*".parse().unwrap();
        assert!(a.wildcard);
        assert!(a.handlers.is_empty());

        let a: Annotation = "token:,,".parse().unwrap();
        assert!(!a.wildcard);
        assert!(a.handlers.is_empty());
    }

    #[test]
    fn test_invalid_annotations() {
        assert_eq!(
            ":on_port".parse::<Annotation>(),
            Err(AnnotationError::EmptyKey(":on_port".into()))
        );
        assert_eq!(
            "".parse::<Annotation>(),
            Err(AnnotationError::EmptyKey(String::new()))
        );
        assert_eq!(
            "a:b:c".parse::<Annotation>(),
            Err(AnnotationError::Malformed("a:b:c".into()))
        );
    }
}
