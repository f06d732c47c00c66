use super::StorageError;

/// The collection holding every todo record.
pub const TODOS_TABLE: &str = "todos";
/// The secondary index used for ordered listing.
pub const CREATED_AT_INDEX: &str = "createdAt";

/// Validates a database, table or index name.
///
/// Names end up inside SQL statements and file names, so they are restricted
/// to ASCII letters, digits and underscores, starting with a letter or an
/// underscore, at most 64 characters.
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 64 {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
