use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::mail::search::{self, SearchOptions};
use crate::protocol::ImapSession;

/// Sorted, de-duplicated, non-empty set of message numbers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SequenceSet(BTreeSet<u32>);

impl SequenceSet {
    /// Returns `None` when `numbers` contains nothing usable.
    pub fn from_numbers(numbers: impl IntoIterator<Item = u32>) -> Option<Self> {
        let set = numbers
            .into_iter()
            .filter(|number| *number > 0)
            .collect::<BTreeSet<_>>();
        (!set.is_empty()).then_some(Self(set))
    }

    /// Every message from `start` to `end` inclusive.
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Self::from_numbers(start.max(1)..=end)
    }

    pub fn single(number: u32) -> Option<Self> {
        Self::from_numbers([number])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.0.contains(&number)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numbers = self.0.iter().copied().peekable();
        let mut first = true;

        while let Some(start) = numbers.next() {
            let mut end = start;
            while let Some(next) = end
                .checked_add(1)
                .filter(|next| numbers.peek() == Some(next))
            {
                end = next;
                numbers.next();
            }

            if !first {
                f.write_str(",")?;
            }
            first = false;

            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }

        Ok(())
    }
}

/// Validates user-supplied ids into a sequence set.
///
/// Every id must be a positive integer; the first offender is reported and nothing
/// reaches the session.
pub fn build<S: AsRef<str>>(ids: &[S]) -> AppResult<SequenceSet> {
    let mut numbers = Vec::with_capacity(ids.len());
    for id in ids {
        let raw = id.as_ref().trim();
        match raw.parse::<u32>() {
            Ok(number) if number > 0 => numbers.push(number),
            _ => return Err(AppError::InvalidIdentifier(id.as_ref().to_string())),
        }
    }

    SequenceSet::from_numbers(numbers)
        .ok_or_else(|| AppError::InvalidInput("no message ids given".to_string()))
}

/// Resolves batch targets from explicit ids or a search query.
///
/// `Ok(None)` means the query matched nothing.
pub fn resolve_targets<S, I>(
    session: &mut S,
    ids: &[I],
    query: Option<&str>,
) -> AppResult<Option<SequenceSet>>
where
    S: ImapSession + ?Sized,
    I: AsRef<str>,
{
    if !ids.is_empty() {
        return build(ids).map(Some);
    }

    let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) else {
        return Err(AppError::InvalidInput(
            "provide message ids or --query".to_string(),
        ));
    };

    let predicate = search::build(&SearchOptions::from_query(query));
    let matches = session.search(&predicate)?;
    debug!(query, matched = matches.len(), "resolved batch targets");

    Ok(SequenceSet::from_numbers(matches))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_compact_ranges() {
        let set = SequenceSet::from_numbers([9, 1, 3, 2, 10, 7, 2]).expect("set");
        assert_eq!(set.to_string(), "1:3,7,9:10");
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn single_number_renders_plainly() {
        assert_eq!(SequenceSet::single(42).expect("set").to_string(), "42");
    }

    #[test]
    fn empty_inputs_give_no_set() {
        assert_eq!(SequenceSet::from_numbers(Vec::new()), None);
        assert_eq!(SequenceSet::from_numbers([0]), None);
        assert_eq!(SequenceSet::range(5, 4), None);
    }

    #[test]
    fn builds_from_trimmed_ids() {
        let set = build(&[" 4", "2 ", "3"]).expect("set");
        assert_eq!(set.to_string(), "2:4");
    }

    #[test]
    fn rejects_bad_ids() {
        for bad in ["x", "-1", "0", "1.5", ""] {
            let err = build(&["1", bad]).expect_err("must fail");
            assert!(matches!(err, AppError::InvalidIdentifier(ref id) if id == bad));
        }
    }

    #[test]
    fn renders_the_largest_message_number() {
        let set = build(&["4294967295"]).expect("set");
        assert_eq!(set.to_string(), "4294967295");

        let set = SequenceSet::from_numbers([u32::MAX - 1, u32::MAX, 3]).expect("set");
        assert_eq!(set.to_string(), "3,4294967294:4294967295");
    }

    #[test]
    fn requires_some_ids() {
        let ids: [&str; 0] = [];
        assert!(matches!(build(&ids), Err(AppError::InvalidInput(_))));
    }
}
