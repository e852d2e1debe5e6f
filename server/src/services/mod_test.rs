use super::*;

#[test]
fn store_errors_carry_grepable_codes() {
    assert_eq!(StoreError::NotFound("board x".into()).error_code(), "E_NOT_FOUND");
    assert_eq!(StoreError::Invalid("slug is required".into()).error_code(), "E_INVALID");
    assert_eq!(StoreError::Database(sqlx::Error::RowNotFound).error_code(), "E_DATABASE");
}

#[test]
fn store_error_messages_name_the_subject() {
    assert_eq!(StoreError::NotFound("board x".into()).to_string(), "not found: board x");
}
