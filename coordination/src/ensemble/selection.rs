//! Best-of-quorum selection.

use std::time::Duration;

/// One successful, non-empty provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub provider: String,
    pub content: String,
    /// Elapsed time from dispatch to arrival.
    pub latency: Duration,
}

impl Candidate {
    /// Length used for ranking, in characters.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Pick the candidate with the longest content.
///
/// `candidates` must be in arrival order; on equal length the earliest
/// arrival wins. Returns `None` only for an empty slice.
pub fn select_longest(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.content_len() <= current.content_len() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(provider: &str, content: &str) -> Candidate {
        Candidate {
            provider: provider.into(),
            content: content.into(),
            latency: Duration::from_millis(10),
        }
    }

    #[test]
    fn longest_wins() {
        let c = vec![
            candidate("a", "short"),
            candidate("b", "much longer answer"),
            candidate("c", "medium one"),
        ];
        assert_eq!(select_longest(&c).unwrap().provider, "b");
    }

    #[test]
    fn tie_goes_to_first_arrival() {
        let c = vec![candidate("a", "1234"), candidate("b", "abcd"), candidate("c", "xy")];
        assert_eq!(select_longest(&c).unwrap().provider, "a");
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        // 4 chars, 8 bytes vs 5 chars, 5 bytes.
        let c = vec![candidate("a", "éééé"), candidate("b", "abcde")];
        assert_eq!(select_longest(&c).unwrap().provider, "b");
    }

    #[test]
    fn empty_slice_selects_nothing() {
        assert!(select_longest(&[]).is_none());
    }
}
