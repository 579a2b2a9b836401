//! Conversion of KV text into typed configuration fields.
//!
//! # Responsibilities
//! - Parse integers, floats, booleans and strings from their textual form
//! - Wrap optional/boxed fields in a freshly allocated holder
//! - Report failures with the target kind and the rejected input
//!
//! # Design Decisions
//! - Pure: coercion returns a value, the update pipeline assigns it
//! - Types without a `Coerce` impl cannot be bound at all, so there is no
//!   silent "unsupported kind" path at runtime
//! - Input is parsed as-is; surrounding whitespace is not trimmed

use thiserror::Error;

/// Text could not be converted into the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {input:?} as {kind}: {cause}")]
pub struct CoercionError {
    /// Semantic kind of the target ("integer", "float", ...).
    pub kind: &'static str,
    /// The rejected text.
    pub input: String,
    /// Underlying parser message.
    pub cause: String,
}

impl CoercionError {
    fn new(kind: &'static str, input: &str, cause: impl ToString) -> Self {
        Self {
            kind,
            input: input.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// A field type that can be populated from a KV value.
pub trait Coerce: Sized + Send + Sync + 'static {
    /// Semantic kind reported in errors and logs.
    const KIND: &'static str;

    /// Parse `text` into a new value.
    fn coerce(text: &str) -> Result<Self, CoercionError>;
}

/// Coerce `text` into `F`.
pub fn coerce<F: Coerce>(text: &str) -> Result<F, CoercionError> {
    F::coerce(text)
}

macro_rules! coerce_from_str {
    ($kind:literal => $($ty:ty),+ $(,)?) => {
        $(
            impl Coerce for $ty {
                const KIND: &'static str = $kind;

                fn coerce(text: &str) -> Result<Self, CoercionError> {
                    text.parse::<$ty>()
                        .map_err(|e| CoercionError::new(Self::KIND, text, e))
                }
            }
        )+
    };
}

coerce_from_str!("integer" => i8, i16, i32, i64, i128, isize);
coerce_from_str!("unsigned integer" => u8, u16, u32, u64, u128, usize);
coerce_from_str!("float" => f32, f64);

impl Coerce for bool {
    const KIND: &'static str = "bool";

    fn coerce(text: &str) -> Result<Self, CoercionError> {
        const TRUTHY: [&str; 3] = ["true", "1", "t"];
        const FALSY: [&str; 3] = ["false", "0", "f"];

        if TRUTHY.iter().any(|lit| lit.eq_ignore_ascii_case(text)) {
            Ok(true)
        } else if FALSY.iter().any(|lit| lit.eq_ignore_ascii_case(text)) {
            Ok(false)
        } else {
            Err(CoercionError::new(Self::KIND, text, "invalid boolean literal"))
        }
    }
}

impl Coerce for String {
    const KIND: &'static str = "string";

    fn coerce(text: &str) -> Result<Self, CoercionError> {
        Ok(text.to_string())
    }
}

impl<F: Coerce> Coerce for Option<F> {
    const KIND: &'static str = F::KIND;

    fn coerce(text: &str) -> Result<Self, CoercionError> {
        F::coerce(text).map(Some)
    }
}

impl<F: Coerce> Coerce for Box<F> {
    const KIND: &'static str = F::KIND;

    fn coerce(text: &str) -> Result<Self, CoercionError> {
        F::coerce(text).map(Box::new)
    }
}
