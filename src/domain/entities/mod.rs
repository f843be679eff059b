use validator::ValidationError;

pub mod alumni;
pub mod employment;
pub mod ids;
pub mod pagination;
pub mod student;
pub mod token;
pub mod user;

/// Payload text is trimmed before it is stored, so whitespace alone counts as
/// empty. Truly empty values are left to the field's `length` rule.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Cannot be blank".into());
        return Err(error);
    }
    Ok(())
}
