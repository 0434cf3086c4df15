use std::collections::HashSet;

use proptest::prelude::*;
use testlog_pipelines::{LogRecord, PipelineStageResult, gather_records, topological_sort};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn header() -> impl Strategy<Value = String> {
    (
        (1000u32..=9999, 0usize..12, 0u32..=31),
        (0u32..24, 0u32..60, 0u32..60, "[0-9]{1,9}"),
        ("[A-Za-z0-9_]{1,8}", "[A-Z]{1,10}"),
        ("[A-Za-z]{1,10}\\.ttcn", 0u32..100_000, "[a-z]{1,10}(:[A-Za-z]{1,10})?"),
    )
        .prop_map(
            |((year, month, day), (h, m, s, sub), (app, event), (file, line, scope))| {
                format!(
                    "{year}/{}/{day:02} {h}:{m:02}:{s:02}.{sub} {app} {event} {file}:{line}({scope})",
                    MONTHS[month]
                )
            },
        )
}

fn words() -> impl Strategy<Value = String> {
    "[a-z]{1,10}( [a-z]{1,10}){0,3}"
}

fn header_line() -> impl Strategy<Value = (String, String)> {
    (header(), prop::option::of(words())).prop_map(|(header, content)| match content {
        Some(content) => (format!("{header} {content}"), content),
        None => (header, String::new()),
    })
}

proptest! {
    #[test]
    fn lines_without_headers_yield_no_records(lines in prop::collection::vec("[a-z ,.]{0,40}", 0..20)) {
        prop_assert_eq!(gather_records(&lines).count(), 0);
    }

    #[test]
    fn every_header_line_is_its_own_record(lines in prop::collection::vec(header_line(), 1..15)) {
        let lines: Vec<String> = lines.into_iter().map(|(line, _)| line).collect();
        let records: Vec<Vec<String>> = gather_records(&lines).collect();

        prop_assert_eq!(records.len(), lines.len());
        for (record, line) in records.iter().zip(&lines) {
            prop_assert_eq!(record, &vec![line.clone()]);
        }
    }

    #[test]
    fn continuation_lines_join_the_record(
        (line, content) in header_line(),
        continuation in prop::collection::vec(words(), 1..6),
    ) {
        let mut lines = vec![line];
        lines.extend(continuation.iter().cloned());

        let records: Vec<Vec<String>> = gather_records(&lines).collect();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].len(), 1 + continuation.len());

        let record = LogRecord::from_lines(&records[0]).unwrap();
        let body = continuation.join("\n");
        let expected = if content.is_empty() { body } else { format!("{content}\n{body}") };
        prop_assert_eq!(record.content(), expected.as_str());
    }

    #[test]
    fn dependencies_precede_dependents(
        n in 1usize..30,
        edges in prop::collection::vec((0usize..30, 0usize..30), 0..60),
    ) {
        // Only edges pointing at lower-numbered nodes, which keeps the graph acyclic.
        let edges: Vec<(usize, usize)> = edges
            .into_iter()
            .filter(|&(from, to)| from < n && to < from)
            .collect();
        let deps = |node: &usize| {
            edges
                .iter()
                .filter(|(from, _)| from == node)
                .map(|&(_, to)| to)
                .collect::<Vec<_>>()
        };

        let order = topological_sort(0..n, deps).unwrap();
        prop_assert_eq!(order.len(), n);
        prop_assert_eq!(order.iter().collect::<HashSet<_>>().len(), n);

        let position = |node: usize| order.iter().position(|&x| x == node).unwrap();
        for &(from, to) in &edges {
            prop_assert!(position(to) < position(from), "{} must precede {}", to, from);
        }
    }

    #[test]
    fn merged_tags_concatenate_in_order(
        first in prop::collection::vec("[a-z]{1,5}", 0..6),
        second in prop::collection::vec("[a-z]{1,5}", 0..6),
    ) {
        let merged = PipelineStageResult::new()
            .merge(&PipelineStageResult::from_tags(first.clone()))
            .merge(&PipelineStageResult::from_tags(second.clone()));

        let expected: Vec<String> = first.into_iter().chain(second).collect();
        prop_assert_eq!(merged.tags().into_iter().collect::<Vec<_>>(), expected);
    }
}
