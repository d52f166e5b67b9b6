use chrono::NaiveDate;
use pmail::mail::search::{self, Combinator, SearchOptions, SearchPredicate, Searchable};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Synthetic {
    from: String,
    to: String,
    subject: String,
    body: String,
    size: u64,
    date: NaiveDate,
}

impl Synthetic {
    fn new(from: &str, subject: &str) -> Self {
        Self {
            from: from.to_string(),
            to: "me@proton.me".to_string(),
            subject: subject.to_string(),
            body: String::new(),
            size: 1_000,
            date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap_or_default(),
        }
    }
}

impl Searchable for Synthetic {
    fn body_contains(&self, needle: &str) -> bool {
        self.body.to_lowercase().contains(&needle.to_lowercase())
    }

    fn header_contains(&self, key: &str, needle: &str) -> bool {
        let haystack = match key.to_ascii_lowercase().as_str() {
            "from" => &self.from,
            "to" => &self.to,
            "subject" => &self.subject,
            _ => return false,
        };
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

#[test]
fn or_search_matches_either_field() {
    let options = SearchOptions {
        from: Some("a@x.com".to_string()),
        subject: Some("test".to_string()),
        combinator: Combinator::Or,
        ..SearchOptions::default()
    };
    let predicate = search::build(&options);

    let messages = [
        Synthetic::new("a@x.com", "hello"),
        Synthetic::new("b@y.com", "a test run"),
        Synthetic::new("c@z.com", "unrelated"),
    ];
    let matched = messages
        .iter()
        .enumerate()
        .filter(|(_, message)| predicate.matches(*message))
        .map(|(position, _)| position)
        .collect::<Vec<_>>();

    assert_eq!(matched, vec![0, 1]);
}

#[test]
fn and_search_has_one_leaf_per_filter() {
    let options = SearchOptions {
        query: Some("invoice".to_string()),
        from: Some("billing@example.com".to_string()),
        since: Some("2026-01-01".to_string()),
        larger_than: Some("1M".to_string()),
        smaller_than: Some("not-a-size".to_string()),
        ..SearchOptions::default()
    };

    match search::build(&options) {
        SearchPredicate::And(leaves) => {
            assert_eq!(leaves.len(), 4);
            assert!(leaves.contains(&SearchPredicate::SizeAbove(1024 * 1024)));
            assert!(leaves.contains(&SearchPredicate::Body("invoice".to_string())));
        }
        other => panic!("expected And root, got {other:?}"),
    }
}

#[test]
fn or_matches_a_message_matching_only_each_filter() {
    let options = SearchOptions {
        from: Some("ada@".to_string()),
        to: Some("team@".to_string()),
        subject: Some("budget".to_string()),
        combinator: Combinator::Or,
        ..SearchOptions::default()
    };
    let predicate = search::build(&options);

    let only_from = Synthetic::new("ada@example.com", "misc");
    let mut only_to = Synthetic::new("x@example.com", "misc");
    only_to.to = "team@example.com".to_string();
    let only_subject = Synthetic::new("x@example.com", "Budget 2027");
    let none = Synthetic::new("x@example.com", "misc");

    assert!(predicate.matches(&only_from));
    assert!(predicate.matches(&only_to));
    assert!(predicate.matches(&only_subject));
    assert!(!predicate.matches(&none));
}

fn leaf() -> impl Strategy<Value = SearchPredicate> {
    prop_oneof![
        "[a-c]{1,2}".prop_map(SearchPredicate::Body),
        ("[a-c]{1,2}").prop_map(|value| SearchPredicate::header("Subject", value)),
        (0_u64..3_000).prop_map(SearchPredicate::SizeAbove),
        (0_u64..3_000).prop_map(SearchPredicate::SizeBelow),
        (1_u32..28).prop_map(|day| SearchPredicate::DateSince(
            NaiveDate::from_ymd_opt(2026, 10, day).unwrap_or_default()
        )),
    ]
}

fn predicate_tree() -> impl Strategy<Value = SearchPredicate> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(SearchPredicate::And),
            prop::collection::vec(inner.clone(), 0..4).prop_map(SearchPredicate::Or),
            inner.prop_map(SearchPredicate::negate),
        ]
    })
}

fn message() -> impl Strategy<Value = Synthetic> {
    ("[a-c]{0,6}", "[a-c]{0,6}", 0_u64..3_000, 1_u32..28).prop_map(|(subject, body, size, day)| {
        Synthetic {
            from: "ada@example.com".to_string(),
            to: "me@proton.me".to_string(),
            subject,
            body,
            size,
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap_or_default(),
        }
    })
}

proptest! {
    #[test]
    fn negation_inverts_every_predicate(predicate in predicate_tree(), message in message()) {
        let negated = predicate.clone().negate();
        prop_assert_eq!(negated.matches(&message), !predicate.matches(&message));
    }

    #[test]
    fn negate_option_wraps_the_whole_root(from in "[a-z]{1,8}", subject in "[a-z]{1,8}") {
        let base = SearchOptions {
            from: Some(from),
            subject: Some(subject),
            ..SearchOptions::default()
        };
        let negated = SearchOptions { negate: true, ..base.clone() };
        prop_assert_eq!(search::build(&negated), search::build(&base).negate());
    }
}
