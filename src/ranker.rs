// =============================================================================
// Snapshot Ranker — search-aware market-strength ordering
// =============================================================================
//
// Orders the latest snapshot set for display using a two-key comparator:
//   1. When a filter query is present, symbols containing the query sort
//      strictly before symbols that do not.
//   2. Within each partition (or globally with no query), descending by
//      strengthPercent.
//
// The comparator is a valid strict weak ordering: match-status is a total
// pre-order refined by the score, so a stable general-purpose sort yields a
// consistent partition.
// =============================================================================

use std::cmp::Ordering;

use crate::types::MarketSnapshot;

/// Rank `snapshots` for display under the given filter `query`.
///
/// Pure function of its inputs: the input set is never mutated, and the
/// result is a permutation of it. The query must already be case-normalized
/// by the caller (the WS handler uppercases it); matching here is a plain
/// substring test. An empty query ranks purely by strength.
///
/// Non-finite strength scores compare equal to each other, which keeps the
/// sort total; malformed scores never reach this point because the feed
/// parser rejects the whole frame.
pub fn rank(snapshots: &[MarketSnapshot], query: &str) -> Vec<MarketSnapshot> {
    let mut ranked = snapshots.to_vec();
    ranked.sort_by(|a, b| compare(a, b, query));
    ranked
}

/// The two-key comparator: match-status partition first, strength second.
fn compare(a: &MarketSnapshot, b: &MarketSnapshot, query: &str) -> Ordering {
    if !query.is_empty() {
        let a_match = a.symbol.contains(query);
        let b_match = b.symbol.contains(query);
        if a_match != b_match {
            return if a_match { Ordering::Less } else { Ordering::Greater };
        }
    }
    b.strength_percent
        .partial_cmp(&a.strength_percent)
        .unwrap_or(Ordering::Equal)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(symbol: &str, strength: f64) -> MarketSnapshot {
        MarketSnapshot {
            symbol: symbol.to_string(),
            strength_percent: strength,
            extra: serde_json::Map::new(),
        }
    }

    fn symbols(ranked: &[MarketSnapshot]) -> Vec<&str> {
        ranked.iter().map(|s| s.symbol.as_str()).collect()
    }

    #[test]
    fn empty_set_yields_empty_result() {
        assert!(rank(&[], "").is_empty());
        assert!(rank(&[], "RELIANCE").is_empty());
    }

    #[test]
    fn empty_query_sorts_by_strength_descending() {
        let set = vec![snap("TCS", 12.0), snap("INFY", 55.0), snap("HDFC", -3.0)];
        let ranked = rank(&set, "");
        assert_eq!(symbols(&ranked), vec!["INFY", "TCS", "HDFC"]);
    }

    #[test]
    fn match_partition_dominates_strength() {
        // A and AB match "A" and precede B even though B has the top score;
        // within the match group A (5) outranks AB (3).
        let set = vec![snap("A", 5.0), snap("B", 9.0), snap("AB", 3.0)];
        let ranked = rank(&set, "A");
        assert_eq!(symbols(&ranked), vec!["A", "AB", "B"]);
    }

    #[test]
    fn query_matches_as_substring_not_prefix() {
        let set = vec![snap("HDFCBANK", 10.0), snap("BANKBARODA", 20.0), snap("TCS", 30.0)];
        let ranked = rank(&set, "BANK");
        assert_eq!(symbols(&ranked), vec!["BANKBARODA", "HDFCBANK", "TCS"]);
    }

    #[test]
    fn result_is_a_permutation_and_input_untouched() {
        let set = vec![snap("A", 1.0), snap("B", 2.0), snap("C", 3.0), snap("D", 2.0)];
        let before = set.clone();
        let ranked = rank(&set, "B");

        assert_eq!(set, before);
        assert_eq!(ranked.len(), set.len());
        let mut got = symbols(&ranked);
        let mut want = symbols(&set);
        got.sort_unstable();
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn adjacent_pairs_satisfy_the_ordering_rule() {
        let set = vec![
            snap("RELIANCE", 41.2),
            snap("TCS", 88.0),
            snap("RELAXO", 12.5),
            snap("INFY", 88.0),
            snap("SBIN", -7.3),
        ];
        let query = "REL";
        let ranked = rank(&set, query);

        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_match = a.symbol.contains(query);
            let b_match = b.symbol.contains(query);
            // No non-match may precede a match.
            assert!(a_match || !b_match, "{} before {}", a.symbol, b.symbol);
            if a_match == b_match {
                assert!(a.strength_percent >= b.strength_percent);
            }
        }
    }

    #[test]
    fn nan_strength_does_not_panic_or_lose_entries() {
        let set = vec![snap("A", f64::NAN), snap("B", 1.0), snap("C", f64::NAN)];
        let ranked = rank(&set, "");
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn negative_scores_order_correctly() {
        let set = vec![snap("A", -10.0), snap("B", -2.5), snap("C", 0.0)];
        let ranked = rank(&set, "");
        assert_eq!(symbols(&ranked), vec!["C", "B", "A"]);
    }
}
