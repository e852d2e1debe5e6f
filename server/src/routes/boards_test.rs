use super::*;

#[test]
fn store_error_to_status_maps_not_found() {
    assert_eq!(store_error_to_status(StoreError::NotFound("board x".into())), StatusCode::NOT_FOUND);
}

#[test]
fn store_error_to_status_maps_invalid_to_bad_request() {
    assert_eq!(store_error_to_status(StoreError::Invalid("slug".into())), StatusCode::BAD_REQUEST);
}

#[test]
fn store_error_to_status_maps_database_to_500() {
    let err = StoreError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(store_error_to_status(err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn append_stroke_body_requires_stroke() {
    assert!(serde_json::from_str::<AppendStrokeBody>("{}").is_err());
    let body: AppendStrokeBody = serde_json::from_value(serde_json::json!({
        "stroke": {
            "id": "s-1", "tool": "erase", "color": "#fff", "size": 12,
            "points": [{"x": 1, "y": 2}], "author_id": "u-1"
        }
    }))
    .expect("body");
    assert_eq!(body.stroke.points.len(), 1);
}

#[test]
fn create_board_body_title_is_optional() {
    let body: CreateBoardBody = serde_json::from_str(r#"{"slug":"b"}"#).expect("body");
    assert_eq!(body.slug, "b");
    assert!(body.title.is_none());
}
