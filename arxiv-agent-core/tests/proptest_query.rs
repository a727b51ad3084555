//! Property-based tests for the query builder and feed normalizer.

use proptest::prelude::*;

use arxiv_agent_core::error::QueryError;
use arxiv_agent_core::feed::parse_feed;
use arxiv_agent_core::query::{author_query, build_author_query, daily_query};

fn category() -> impl Strategy<Value = String> {
    "[a-z]{2,5}(\\.[A-Z]{2})?"
}

// --- Author mode ---

proptest! {
    #[test]
    fn author_query_embeds_exact_max_results(n in 1i64..=100) {
        let qs = build_author_query("Doe", n).unwrap();
        let expected = format!("&max_results={}", n);
        prop_assert!(qs.ends_with(&expected));
    }

    #[test]
    fn author_query_rejects_out_of_range(n in prop_oneof![i64::MIN..1i64, 101i64..i64::MAX]) {
        let rejected = matches!(
            author_query("Doe", n),
            Err(QueryError::MaxResultsOutOfRange { .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn author_query_never_contains_raw_spaces(name in "[A-Za-z]{1,10}( [A-Za-z]{1,10}){0,3}") {
        let qs = build_author_query(&name, 10).unwrap();
        prop_assert!(!qs.contains(' '));
        prop_assert!(!qs.contains("%20"));
    }
}

// --- Daily mode ---

proptest! {
    #[test]
    fn daily_query_mentions_every_category(cats in prop::collection::vec(category(), 1..6)) {
        let q = daily_query(&cats, None).unwrap();
        for c in &cats {
            let term = format!("cat:{}", c);
            prop_assert!(q.search_query.contains(&term));
        }
        prop_assert!(q.search_query.ends_with("AND submittedDate:[now-3d TO now]"));
        if cats.len() > 1 {
            prop_assert!(q.search_query.starts_with('('));
            prop_assert_eq!(q.search_query.matches(" OR ").count(), cats.len() - 1);
        }
    }

    #[test]
    fn daily_query_order_does_not_change_terms(cats in prop::collection::vec(category(), 2..5)) {
        let mut reversed = cats.clone();
        reversed.reverse();
        let a = daily_query(&cats, None).unwrap().search_query;
        let b = daily_query(&reversed, None).unwrap().search_query;

        let terms = |s: &str| {
            let inner = s.split(" AND ").next().unwrap_or_default();
            let mut t: Vec<String> = inner
                .trim_matches(|c| c == '(' || c == ')')
                .split(" OR ")
                .map(String::from)
                .collect();
            t.sort();
            t
        };
        prop_assert_eq!(terms(&a), terms(&b));
    }

    #[test]
    fn daily_query_always_has_date_constraint(
        cats in prop::collection::vec(prop_oneof![category(), Just(String::new()), Just("  ".to_string())], 0..4)
    ) {
        let q = daily_query(&cats, None).unwrap();
        prop_assert!(q.search_query.contains("submittedDate:"));
    }
}

// --- Normalizer robustness ---

proptest! {
    #[test]
    fn parse_feed_never_panics(input in ".{0,300}") {
        let _ = parse_feed(&input);
    }

    #[test]
    fn parse_feed_keeps_every_titled_entry(titles in prop::collection::vec("[A-Za-z][A-Za-z ]{0,30}", 0..8)) {
        let entries: String = titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!(
                "<entry><id>http://arxiv.org/abs/{i}</id><title>{t}</title></entry>"
            ))
            .collect();
        let xml = format!(r#"<feed xmlns="http://www.w3.org/2005/Atom">{entries}</feed>"#);
        let papers = parse_feed(&xml);
        prop_assert_eq!(papers.len(), titles.len());
        for (paper, title) in papers.iter().zip(&titles) {
            let expected = title.split_whitespace().collect::<Vec<_>>().join(" ");
            prop_assert_eq!(&paper.title, &expected);
        }
    }
}
