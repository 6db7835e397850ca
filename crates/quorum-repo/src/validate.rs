//! Field validators shared by the entity types

use thiserror::Error;

/// Separator used when ids are joined into composite keys
pub const ID_SEPARATOR: char = ':';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult = std::result::Result<(), ValidationError>;

/// Non-blank text.
pub fn required(field: &str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

/// Non-blank id that can be joined into a composite key.
pub fn identifier(field: &str, value: &str) -> ValidationResult {
    required(field, value)?;
    if value.contains(ID_SEPARATOR) {
        return Err(ValidationError::new(
            field,
            format!("must not contain {ID_SEPARATOR:?}"),
        ));
    }
    Ok(())
}

pub fn max_chars(field: &str, value: &str, max: usize) -> ValidationResult {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters (got {len})"),
        ));
    }
    Ok(())
}

pub fn min_chars(field: &str, value: &str, min: usize) -> ValidationResult {
    let len = value.trim().chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

/// Required text no longer than `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> ValidationResult {
    required(field, value)?;
    max_chars(field, value, max)
}

pub fn charset(field: &str, value: &str, allowed: impl Fn(char) -> bool) -> ValidationResult {
    match value.chars().find(|c| !allowed(*c)) {
        Some(c) => Err(ValidationError::new(
            field,
            format!("contains invalid character {c:?}"),
        )),
        None => Ok(()),
    }
}

pub fn max_items<T>(field: &str, items: &[T], max: usize) -> ValidationResult {
    if items.len() > max {
        return Err(ValidationError::new(
            field,
            format!("must have at most {max} entries"),
        ));
    }
    Ok(())
}
