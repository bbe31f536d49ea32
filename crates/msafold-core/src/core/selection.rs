//! Deterministic top-N truncation of ranked records.
//!
//! By convention the first record of a search result or an alignment is the query. It
//! never counts towards the requested number of hits and is never part of the hit
//! subset; callers that need it back (to write an alignment input, for instance) use
//! [`TopHits::with_query`].
//!
//! When fewer than `k` hits follow the query, all of them are kept. A shortfall is only
//! logged.

use tracing::info;

/// The result of [`select_top_hits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopHits<'a, T> {
    pub query: Option<&'a T>,
    pub hits: &'a [T],
}

impl<T: Clone> TopHits<'_, T> {
    /// The query followed by the selected hits, ready for final use.
    pub fn with_query(&self) -> Vec<T> {
        self.query
            .into_iter()
            .chain(self.hits.iter())
            .cloned()
            .collect()
    }
}

/// Selects the first `min(k, n - 1)` records after the query.
pub fn select_top_hits<T>(records: &[T], k: usize) -> TopHits<'_, T> {
    let Some((query, rest)) = records.split_first() else {
        return TopHits {
            query: None,
            hits: &[],
        };
    };

    let keep = k.min(rest.len());
    if keep < k {
        info!(
            requested = k,
            available = rest.len(),
            "Fewer hits than requested; keeping all {} available.",
            keep
        );
    }

    TopHits {
        query: Some(query),
        hits: &rest[..keep],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_is_min_of_k_and_remaining_records() {
        for n in 0..8usize {
            let records: Vec<usize> = (0..n).collect();
            for k in 0..10usize {
                let selected = select_top_hits(&records, k);
                assert_eq!(selected.hits.len(), k.min(n.saturating_sub(1)));
            }
        }
    }

    #[test]
    fn query_is_never_part_of_the_hit_subset() {
        let records = vec!["query", "h1", "h2", "h3"];
        let selected = select_top_hits(&records, 10);
        assert_eq!(selected.query, Some(&"query"));
        assert!(!selected.hits.contains(&"query"));
        assert_eq!(selected.hits, &["h1", "h2", "h3"]);
    }

    #[test]
    fn hits_keep_their_original_order() {
        let records = vec!["q", "h1", "h2", "h3", "h4"];
        assert_eq!(select_top_hits(&records, 2).hits, &["h1", "h2"]);
    }

    #[test]
    fn with_query_re_adds_the_query_first() {
        let records = vec!["q", "h1", "h2", "h3"];
        assert_eq!(select_top_hits(&records, 2).with_query(), vec!["q", "h1", "h2"]);
    }

    #[test]
    fn empty_and_query_only_inputs_select_nothing() {
        let empty: Vec<&str> = vec![];
        let selected = select_top_hits(&empty, 3);
        assert!(selected.query.is_none());
        assert!(selected.hits.is_empty());

        let only_query = vec!["q"];
        let selected = select_top_hits(&only_query, 3);
        assert_eq!(selected.with_query(), vec!["q"]);
    }
}
