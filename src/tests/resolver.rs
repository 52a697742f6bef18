use super::*;
use crate::adjudicator::{Adjudicator, AdjudicatorError};
use crate::gap::{fill_gaps, GapSettings};
use crate::hierarchy::{build, DEFAULT_ROOT_TITLE};
use crate::matching::similarity;
use crate::report::{Collector, Silent};
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

const CHAPTER: &str = "# 7 Basic data validation\nIntro text.\n## 7.1 Data validation in DOP\nDOP body.\n## 7.2 JSON Schema in a nutshell\nSchema body.\n";

const NOISY: &str = "# 7 Basic data validation\nIntro text.\n## 7.1 Data validatlon in D0P\nDOP body.\n## 7.2 JSON Schema in a nutshell\nSchema body.\n";

fn chapter_tree() -> NodeTree {
    build(
        vec![
            NodeRecord::new(NodeId(1), "7 Basic data validation", 0, Hints::default()),
            NodeRecord::new(NodeId(2), "7.1 Data validation in DOP", 1, Hints::default()),
            NodeRecord::new(NodeId(3), "7.2 JSON Schema in a nutshell", 1, Hints::default()),
        ],
        DEFAULT_ROOT_TITLE,
    )
    .unwrap()
}

fn with_threshold(threshold: f64) -> ResolverSettings {
    let mut settings = ResolverSettings::default();
    settings.matching.fuzzy_threshold = threshold;
    settings
}

fn texts<'t>(segments: &[Segment], raw: &'t str) -> Vec<&'t str> {
    segments.iter().map(|s| s.text(raw)).collect()
}

#[test]
fn test_exact_spans() {
    let settings = ResolverSettings::default();
    let mut resolver = BoundaryResolver::new(CHAPTER, &settings, &Silent);
    let segments = resolver.resolve_tree(&chapter_tree());

    assert_eq!(
        texts(&segments, CHAPTER),
        vec!["\nIntro text.\n", "\nDOP body.\n", "\nSchema body.\n"]
    );
    assert!(segments
        .iter()
        .all(|s| s.method == Method::Exact && (s.confidence - 1.0).abs() < f64::EPSILON));
    assert_eq!(segments[1].heading(CHAPTER), "## 7.1 Data validation in DOP");
    assert_eq!(segments[2].end_offset, CHAPTER.len());
    assert!(resolver.take_warnings().is_empty());
}

#[test]
fn test_fuzzy_recovers_noisy_heading() {
    let settings = ResolverSettings::default();
    let mut resolver = BoundaryResolver::new(NOISY, &settings, &Silent);
    let segments = resolver.resolve_tree(&chapter_tree());

    let fuzzy = &segments[1];
    assert_eq!(fuzzy.method, Method::Fuzzy);
    assert_eq!(fuzzy.text(NOISY), "\nDOP body.\n");
    let score = similarity("data validation in dop", "data validatlon in d0p");
    assert!((fuzzy.confidence - 0.8 * score * APPROXIMATE_WEIGHT).abs() < 1e-9);
    assert_eq!(segments[0].text(NOISY), "\nIntro text.\n");
}

#[test]
fn test_failed_node_does_not_block_later_nodes() {
    let settings = with_threshold(0.95);
    let mut resolver = BoundaryResolver::new(NOISY, &settings, &Silent);
    let segments = resolver.resolve_tree(&chapter_tree());

    assert_eq!(segments[1], Segment::unresolved(NodeId(2)));
    assert_eq!(segments[2].method, Method::Exact);
    assert_eq!(segments[2].text(NOISY), "\nSchema body.\n");
    assert_eq!(
        segments[0].text(NOISY),
        "\nIntro text.\n## 7.1 Data validatlon in D0P\nDOP body.\n",
        "The parent keeps the text up to the next heading that was found"
    );
    assert_eq!(
        resolver.take_warnings(),
        vec![Warning::BoundaryUnresolved {
            node_id: NodeId(2),
            title: "7.1 Data validation in DOP".to_string(),
        }]
    );
}

#[test]
fn test_resolved_segments_are_monotonic() {
    for (raw, threshold) in [(CHAPTER, 0.6), (NOISY, 0.6), (NOISY, 0.95)] {
        let settings = with_threshold(threshold);
        let mut resolver = BoundaryResolver::new(raw, &settings, &Silent);
        let segments = resolver.resolve_tree(&chapter_tree());
        let resolved: Vec<&Segment> = segments.iter().filter(|s| s.is_resolved()).collect();
        for pair in resolved.windows(2) {
            assert!(
                pair[0].end_offset <= pair[1].start_offset,
                "{pair:?} overlap at threshold {threshold}"
            );
        }
    }
}

#[test]
fn test_resolution_is_deterministic() {
    let settings = ResolverSettings::default();
    let tree = chapter_tree();
    let first = BoundaryResolver::new(NOISY, &settings, &Silent).resolve_tree(&tree);
    let second = BoundaryResolver::new(NOISY, &settings, &Silent).resolve_tree(&tree);
    assert_eq!(first, second);
}

#[test]
fn test_page_hint_skips_earlier_mention() {
    let raw = "## Page 1\nSummary\nA first mention on the title page.\n## Page 2\nBody of the report.\n## Page 3\nSummary\nThe actual summary.\n";
    let settings = ResolverSettings::default();
    let resolver = BoundaryResolver::new(raw, &settings, &Silent);
    assert_eq!(resolver.pages().markers().len(), 3);

    let hinted = Hints {
        start_page: Some(3),
        ..Hints::default()
    };
    let found = resolver.search(NodeId(1), "Summary", &hinted, 0).unwrap();
    assert_eq!(found.position, raw.rfind("Summary").unwrap());

    let unhinted = resolver
        .search(NodeId(1), "Summary", &Hints::default(), 0)
        .unwrap();
    assert_eq!(unhinted.position, raw.find("Summary").unwrap());
}

#[test]
fn test_windows_widen_towards_full_text() {
    let raw = "x".repeat(100);
    let settings = ResolverSettings::default();
    let resolver = BoundaryResolver::new(&raw, &settings, &Silent);
    let hints = Hints {
        start_offset: Some(40),
        end_offset: Some(50),
        ..Hints::default()
    };

    assert_eq!(resolver.windows(&hints, 0), vec![40..50, 35..55, 0..100]);
    assert_eq!(resolver.windows(&hints, 45), vec![45..50, 45..55, 45..100]);
    assert_eq!(resolver.windows(&Hints::default(), 10), vec![10..100]);
}

#[test]
fn test_synthetic_introduction_takes_lead_in() {
    let raw = "# 7 Basic\nLead-in prose.\n### 7.1.1 Details\nDetail body.\n";
    let tree = build(
        vec![
            NodeRecord::new(NodeId(1), "7 Basic", 0, Hints::default()),
            NodeRecord::new(NodeId(2), "7.1.1 Details", 2, Hints::default()),
        ],
        DEFAULT_ROOT_TITLE,
    )
    .unwrap();
    let (tree, _) = fill_gaps(tree, &GapSettings::default()).unwrap();
    let settings = ResolverSettings::default();
    let segments = BoundaryResolver::new(raw, &settings, &Silent).resolve_tree(&tree);

    assert_eq!(
        texts(&segments, raw),
        vec!["", "\nLead-in prose.\n", "\nDetail body.\n"]
    );
    let intro = &segments[1];
    assert_eq!(intro.start_offset, segments[0].start_offset);
    assert_eq!(intro.method, Method::Exact);
}

#[test]
fn test_synthetic_under_unresolved_parent_stays_unresolved() {
    let settings = ResolverSettings::default();
    let mut resolver = BoundaryResolver::new("text\n", &settings, &Silent);
    let node = NodeRecord::synthetic(NodeId(9), "7.0 Introduction", 1, Hints::default());
    let parent = Segment::unresolved(NodeId(7));
    assert_eq!(
        resolver.resolve_synthetic(&node, Some(&parent), None),
        Segment::unresolved(NodeId(9))
    );
}

#[rstest]
#[case::renumbered(
    "# 8 Basic data validation\nIntro text.\n## 8.1 Data validation in DOP\nDOP body.\n## 8.2 JSON Schema in a nutshell\nSchema body.\n",
    "## 8.1 Data validation in DOP",
    Method::Exact
)]
#[case::unnumbered(
    "# Basic data validation\nIntro text.\n## Data validation in DOP\nDOP body.\n## JSON Schema in a nutshell\nSchema body.\n",
    "## Data validation in DOP",
    Method::Exact
)]
#[case::renumbered_and_recased(
    "# 8 Basic data validation\nIntro text.\n## 8.1 DATA VALIDATION IN DOP\nDOP body.\n## 8.2 JSON Schema in a nutshell\nSchema body.\n",
    "## 8.1 DATA VALIDATION IN DOP",
    Method::Normalized
)]
fn test_heading_numbering_stays_out_of_content(
    #[case] raw: &str,
    #[case] heading: &str,
    #[case] method: Method,
) {
    let settings = ResolverSettings::default();
    let mut resolver = BoundaryResolver::new(raw, &settings, &Silent);
    let segments = resolver.resolve_tree(&chapter_tree());

    assert_eq!(
        texts(&segments, raw),
        vec!["\nIntro text.\n", "\nDOP body.\n", "\nSchema body.\n"]
    );
    assert_eq!(segments[1].heading(raw), heading);
    assert_eq!(segments[1].method, method);
    assert_eq!(segments[1].heading_offset, raw.find("##").unwrap());
}

#[test]
fn test_canary_confirms_exact_headings() {
    let settings = ResolverSettings::default();
    let resolver = BoundaryResolver::new(CHAPTER, &settings, &Silent);
    let node = chapter_tree().nodes()[1].clone();
    let boundary = resolver.locate(&node, None, 0).unwrap();
    assert_eq!(resolver.canary(&node.title, &boundary), Canary::Confirmed);
    assert_eq!(
        resolver.canary("7.2 JSON Schema in a nutshell", &boundary),
        Canary::Failed,
        "Another node's title is not on this heading line"
    );

    let inverted = Boundary {
        end: boundary.start - 1,
        ..boundary
    };
    assert_eq!(resolver.canary(&node.title, &inverted), Canary::Failed);
}

#[test]
fn test_canary_rejects_unrelated_text() {
    let settings = ResolverSettings::default();
    let resolver = BoundaryResolver::new(CHAPTER, &settings, &Silent);
    let position = CHAPTER.find("Schema body").unwrap();
    let body = Boundary {
        heading: MatchResult {
            position,
            end: position + "Schema".len(),
            score: 1.0,
            tier: MatchTier::Exact,
        },
        start: position + "Schema".len(),
        end: CHAPTER.len(),
        next_heading: None,
    };
    assert_eq!(
        resolver.canary("7.2 JSON Schema in a nutshell", &body),
        Canary::Failed
    );

    let fuzzy = Boundary {
        heading: MatchResult {
            end: position + "Schema body.".len(),
            score: 0.7,
            tier: MatchTier::Fuzzy,
            ..body.heading
        },
        start: position + "Schema body.".len(),
        ..body
    };
    assert_eq!(
        resolver.canary("7.1 Data validation in DOP", &fuzzy),
        Canary::Failed
    );
}

#[test]
fn test_approximate_headings_get_reduced_confidence() {
    let settings = ResolverSettings::default();
    let resolver = BoundaryResolver::new(NOISY, &settings, &Silent);
    let node = chapter_tree().nodes()[1].clone();
    let boundary = resolver.locate(&node, None, 0).unwrap();
    assert_eq!(boundary.heading.tier, MatchTier::Fuzzy);
    assert_eq!(resolver.canary(&node.title, &boundary), Canary::Approximate);

    let mut resolver = BoundaryResolver::new(NOISY, &settings, &Silent);
    let segments = resolver.resolve_tree(&chapter_tree());
    assert!(segments[1].confidence < segments[0].confidence);
    assert!(segments[1].confidence > 0.0);
    assert!(resolver.take_warnings().is_empty());
}

#[test]
fn test_tier_attempts_are_reported() {
    let settings = ResolverSettings::default();
    let collector = Collector::new();
    let mut resolver = BoundaryResolver::new(NOISY, &settings, &collector);
    let _ = resolver.resolve_tree(&chapter_tree());

    let fuzzy_hits = collector
        .events()
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::TierAttempt {
                    node_id: NodeId(2),
                    tier: MatchTier::Fuzzy,
                    found: true,
                    ..
                }
            )
        })
        .count();
    assert!(fuzzy_hits >= 1);
    let resolved = collector
        .events()
        .iter()
        .filter(|event| matches!(event, Event::Resolved { .. }))
        .count();
    assert_eq!(resolved, 3);
}

const TIED: &str = "Summary of resultz\nfiller line here\nSummary of resultz\nend\n";

struct PickLast;

impl Adjudicator for PickLast {
    fn choose(&self, _title: &str, candidates: &[Candidate]) -> Result<usize, AdjudicatorError> {
        Ok(candidates.len() - 1)
    }
}

struct Slow;

impl Adjudicator for Slow {
    fn choose(&self, _title: &str, _candidates: &[Candidate]) -> Result<usize, AdjudicatorError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(1)
    }
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    }
}

#[test]
fn test_adjudicator_breaks_fuzzy_ties() {
    let settings = ResolverSettings::default();
    let adjudication = Adjudication::new(Arc::new(PickLast), single_attempt(), Duration::from_secs(5));
    let resolver =
        BoundaryResolver::new(TIED, &settings, &Silent).with_adjudication(Some(&adjudication));
    let found = resolver
        .search(NodeId(1), "Summary of results", &Hints::default(), 0)
        .unwrap();
    assert_eq!(found.position, TIED.rfind("Summary").unwrap());

    let unassisted = BoundaryResolver::new(TIED, &settings, &Silent);
    let found = unassisted
        .search(NodeId(1), "Summary of results", &Hints::default(), 0)
        .unwrap();
    assert_eq!(found.position, 0);
}

#[test]
fn test_adjudicator_timeout_falls_back_to_first_candidate() {
    let settings = ResolverSettings::default();
    let adjudication = Adjudication::new(Arc::new(Slow), single_attempt(), Duration::from_millis(20));
    let resolver =
        BoundaryResolver::new(TIED, &settings, &Silent).with_adjudication(Some(&adjudication));
    let found = resolver
        .search(NodeId(1), "Summary of results", &Hints::default(), 0)
        .unwrap();
    assert_eq!(found.position, 0);
}

type Layout = Vec<(usize, String, String)>;

/// Sections as (level, title word, body line).
fn layout() -> impl Strategy<Value = Layout> {
    prop::collection::vec(
        (0usize..4, "[a-z]{3,8}", "[a-z]{2,10}( [a-z]{2,10}){0,5}"),
        1..12,
    )
}

/// Outline and text for `sections`, leaving out the headings `present` rejects.
fn layout_document(sections: &Layout, present: impl Fn(usize) -> bool) -> (NodeTree, String) {
    let mut raw = String::new();
    let mut records = Vec::new();
    for ((level, word, body), id) in sections.iter().zip(1u32..) {
        let title = format!("{id} Heading {word}");
        if present(records.len()) {
            raw.push_str(&format!("{} {title}\n", "#".repeat(level + 1)));
        }
        raw.push_str(body);
        raw.push('\n');
        records.push(NodeRecord::new(NodeId(id), title, *level, Hints::default()));
    }
    let tree = build(records, DEFAULT_ROOT_TITLE).unwrap();
    let (tree, _) = fill_gaps(tree, &GapSettings::default()).unwrap();
    (tree, raw)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_clean_layouts_resolve_to_their_bodies(sections in layout()) {
        let (tree, raw) = layout_document(&sections, |_| true);
        let settings = ResolverSettings::default();
        let segments = BoundaryResolver::new(&raw, &settings, &Silent).resolve_tree(&tree);
        let nodes = tree.nodes();

        for (i, (node, segment)) in nodes.iter().zip(&segments).enumerate() {
            prop_assert!(segment.is_resolved());
            if node.is_synthetic {
                continue;
            }
            prop_assert_eq!(segment.method, Method::Exact);
            prop_assert!((segment.confidence - 1.0).abs() < f64::EPSILON);
            if nodes.get(i + 1).is_none_or(|next| !next.is_synthetic) {
                let body = &sections[usize::try_from(node.id.0).unwrap() - 1].2;
                prop_assert_eq!(segment.text(&raw), format!("\n{body}\n"));
            }
        }
    }

    #[test]
    fn test_resolution_is_monotonic_and_deterministic(
        sections in layout(),
        missing in prop::collection::vec(any::<bool>(), 12),
    ) {
        let (tree, raw) = layout_document(&sections, |i| !missing[i]);
        let settings = ResolverSettings::default();
        let first = BoundaryResolver::new(&raw, &settings, &Silent).resolve_tree(&tree);
        let second = BoundaryResolver::new(&raw, &settings, &Silent).resolve_tree(&tree);
        prop_assert_eq!(&first, &second);

        let resolved: Vec<&Segment> = first.iter().filter(|s| s.is_resolved()).collect();
        for segment in &resolved {
            prop_assert!(segment.heading_offset <= segment.start_offset);
            prop_assert!(segment.start_offset <= segment.end_offset);
            prop_assert!(segment.end_offset <= raw.len());
        }
        for pair in resolved.windows(2) {
            prop_assert!(
                pair[0].end_offset <= pair[1].start_offset,
                "{:?} overlaps {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}
