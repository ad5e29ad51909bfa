//! Structural checks on API models.
//!
//! Only field presence is checked. List fields are walked element by
//! element, skipping zero-valued elements, and the first failure is
//! reported with an index-qualified dotted name such as
//! `stages.2.stageName`.

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name} {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub name: String,
    pub message: String,
}

impl ValidationError {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            message: "in body is required".to_string(),
        }
    }

    /// Qualify the field name with the path of its parent.
    pub fn within(mut self, prefix: &str) -> Self {
        self.name = if self.name.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.name)
        };
        self
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::local(format!("validation failed: {err}"))
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Validate every non-default element of a list field named `field`.
pub fn validate_each<T>(field: &str, items: &[T]) -> Result<(), ValidationError>
where
    T: Validate + Default + PartialEq,
{
    let zero = T::default();
    for (i, item) in items.iter().enumerate() {
        if *item == zero {
            continue;
        }
        item.validate()
            .map_err(|err| err.within(&format!("{field}.{i}")))?;
    }
    Ok(())
}

pub fn require(name: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(ValidationError::required(name)),
    }
}
