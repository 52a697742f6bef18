use super::*;
use crate::formats::json::JsonIndex;
use crate::formats::markdown::MarkdownOutline;
use crate::formats::Format;
use crate::report::Collector;
use pretty_assertions::assert_eq;

const CHAPTER: &str = "# 7 Basic data validation\nIntro text.\n## 7.1 Data validation in DOP\nDOP body.\n## 7.2 JSON Schema in a nutshell\nSchema body.\n";

const NOISY: &str = "# 7 Basic data validation\nIntro text.\n## 7.1 Data validatlon in D0P\nDOP body.\n## 7.2 JSON Schema in a nutshell\nSchema body.\n";

const CHAPTER_INDEX: &str = r#"[
    {"id": 1, "title": "7 Basic data validation", "level": 0, "children_ids": [2, 3]},
    {"id": 2, "title": "7.1 Data validation in DOP", "level": 1},
    {"id": 3, "title": "7.2 JSON Schema in a nutshell", "level": 1}
]"#;

fn headings() -> Vec<RawHeading> {
    JsonIndex.parse_index(CHAPTER_INDEX).unwrap()
}

fn with_threshold(threshold: f64) -> Pipeline {
    let mut settings = Settings::default();
    settings.resolver.matching.fuzzy_threshold = threshold;
    Pipeline::new(settings)
}

#[test]
fn test_clean_chapter() {
    let result = Pipeline::new(Settings::default())
        .run(headings(), CHAPTER)
        .unwrap();

    let texts: Vec<&str> = result.segments.iter().map(|s| s.text(CHAPTER)).collect();
    assert_eq!(
        texts,
        vec!["\nIntro text.\n", "\nDOP body.\n", "\nSchema body.\n"]
    );
    assert_eq!(result.summary.exact, 3);
    assert_eq!(result.summary.unresolved, 0);
    assert!(result.summary.warnings.is_empty());
    assert!(result.tree.iter().all(|n| n.has_content));
    assert_eq!(result.segments_by(Method::Exact).len(), 3);
}

#[test]
fn test_noisy_heading_counts_as_fuzzy() {
    let result = with_threshold(0.6).run(headings(), NOISY).unwrap();
    assert_eq!(result.summary.exact, 2);
    assert_eq!(result.summary.fuzzy, 1);
    assert_eq!(
        result.segment_for(NodeId(2)).map(|s| s.method),
        Some(Method::Fuzzy)
    );
}

#[test]
fn test_strict_threshold_leaves_noisy_heading_unresolved() {
    let result = with_threshold(0.95).run(headings(), NOISY).unwrap();
    assert_eq!(result.summary.unresolved, 1);
    assert_eq!(result.summary.exact, 2);
    assert_eq!(result.unresolved.len(), 1);
    assert_eq!(result.unresolved[0].node_id, NodeId(2));
    assert!(result.segment_for(NodeId(3)).is_some());
    assert!(result
        .summary
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::BoundaryUnresolved { node_id: NodeId(2), .. })));
}

#[test]
fn test_gaps_are_filled_and_counted() {
    let raw = "# 7 Basic\nLead-in prose.\n### 7.1.1 Details\nDetail body.\n";
    let headings = JsonIndex
        .parse_index(
            r#"[{"id": 1, "title": "7 Basic", "level": 1}, {"id": 2, "title": "7.1.1 Details", "level": 3}]"#,
        )
        .unwrap();
    let result = Pipeline::new(Settings::default()).run(headings, raw).unwrap();

    assert_eq!(result.tree.len(), 4);
    assert_eq!(result.summary.synthetic, 2);
    assert_eq!(result.summary.exact, 2);
    let texts: Vec<&str> = result.segments.iter().map(|s| s.text(raw)).collect();
    assert_eq!(texts, vec!["\nLead-in prose.\n", "\nDetail body.\n"]);
    assert!(matches!(
        result.summary.warnings.as_slice(),
        [Warning::GapInserted { level: 2, .. }]
    ));
}

#[test]
fn test_structural_errors_abort_the_document() {
    let duplicate = JsonIndex
        .parse_index(r#"[{"id": 1, "title": "A", "level": 0}, {"id": 1, "title": "B", "level": 0}]"#)
        .unwrap();
    let pipeline = Pipeline::new(Settings::default());
    assert!(matches!(
        pipeline.run(duplicate, "A\nB\n"),
        Err(StructuralError::DuplicateId { .. })
    ));
    assert!(matches!(
        pipeline.run(Vec::new(), "text"),
        Err(StructuralError::EmptyIndex)
    ));
}

#[test]
fn test_batch_matches_sequential_runs() {
    let documents = vec![
        DocumentInput {
            name: "clean".to_string(),
            headings: headings(),
            raw_text: CHAPTER.to_string(),
        },
        DocumentInput {
            name: "broken".to_string(),
            headings: Vec::new(),
            raw_text: CHAPTER.to_string(),
        },
        DocumentInput {
            name: "noisy".to_string(),
            headings: headings(),
            raw_text: NOISY.to_string(),
        },
    ];
    let pipeline = Pipeline::new(Settings::default());
    let batch = pipeline.run_batch(&documents);

    assert_eq!(batch.len(), 3);
    assert!(batch[1].is_err());
    for (doc, result) in documents.iter().zip(&batch) {
        let sequential = pipeline.run_named(&doc.name, doc.headings.clone(), &doc.raw_text);
        match (result, sequential) {
            (Ok(batched), Ok(sequential)) => assert_eq!(
                serde_json::to_value(batched).unwrap(),
                serde_json::to_value(&sequential).unwrap()
            ),
            (Err(batched), Err(sequential)) => assert_eq!(*batched, sequential),
            _ => panic!("{} differs between batch and sequential runs", doc.name),
        }
    }
}

#[test]
fn test_markdown_and_json_indexes_agree() {
    let markdown = "# 7 Basic data validation\n## 7.1 Data validation in DOP\n## 7.2 JSON Schema in a nutshell\n";
    let pipeline = Pipeline::new(Settings::default());
    let from_markdown = pipeline
        .run(MarkdownOutline.parse_index(markdown).unwrap(), CHAPTER)
        .unwrap();
    let from_json = pipeline.run(headings(), CHAPTER).unwrap();
    assert_eq!(
        serde_json::to_value(&from_markdown.segments).unwrap(),
        serde_json::to_value(&from_json.segments).unwrap()
    );
}

#[test]
fn test_events_bracket_the_document() {
    let collector = Arc::new(Collector::new());
    let pipeline = Pipeline::new(Settings::default()).with_reporter(collector.clone());
    pipeline.run_named("chapter", headings(), CHAPTER).unwrap();

    let events = collector.events();
    assert!(matches!(
        events.first(),
        Some(Event::DocumentStarted { document, nodes: 3, .. }) if document == "chapter"
    ));
    assert!(matches!(
        events.last(),
        Some(Event::DocumentFinished { summary, .. }) if summary.exact == 3
    ));
}
