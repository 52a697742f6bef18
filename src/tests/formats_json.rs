use super::JsonIndex;
use crate::formats::Format;
use crate::node::Hints;

#[test]
fn test_bare_array() {
    let source = r#"[
        {"id": 1, "title": "7 Basic data validation", "level": 0, "start_page": 12, "end_page": 20},
        {"id": 2, "title": "7.1 Data validation in DOP", "level": 1, "children_ids": []}
    ]"#;
    let headings = JsonIndex.parse_index(source).unwrap();

    assert_eq!(headings.len(), 2);
    assert_eq!(headings[0].title, "7 Basic data validation");
    assert_eq!(
        headings[0].hints,
        Hints {
            start_page: Some(12),
            end_page: Some(20),
            ..Hints::default()
        }
    );
    assert!(headings[1].hints.is_empty());
    assert_eq!(headings[1].children_ids, Some(vec![]));
}

#[test]
fn test_wrapped_object() {
    let source = r#"{"nodes": [{"id": 3, "title": "Preface", "level": 0, "start_offset": 40}]}"#;
    let headings = JsonIndex.parse_index(source).unwrap();
    assert_eq!(headings[0].id, 3);
    assert_eq!(headings[0].hints.start_offset, Some(40));
}

#[test]
fn test_negative_level_is_a_decode_error() {
    let source = r#"[{"id": 1, "title": "Broken", "level": -1}]"#;
    assert!(JsonIndex.parse_index(source).is_err());
}
