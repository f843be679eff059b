use std::collections::BTreeMap;

use crate::entities::alumni::CountBucket;

pub mod alumni;
pub mod auth;
pub mod employment;
pub mod extractors;
pub mod students;

/// Counts occurrences of each key, ordered by key.
fn tally<I>(keys: I) -> Vec<CountBucket>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, total)| CountBucket { key, total })
        .collect()
}

/// Largest bucket first; ties keep key order.
fn largest_first(mut buckets: Vec<CountBucket>) -> Vec<CountBucket> {
    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_and_orders() {
        let buckets = largest_first(tally(["b", "a", "b", "c"].map(String::from)));
        let keys: Vec<_> = buckets.iter().map(|b| (b.key.as_str(), b.total)).collect();
        assert_eq!(keys, vec![("b", 2), ("a", 1), ("c", 1)]);
    }
}
