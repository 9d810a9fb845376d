//! Scalar and collection idioms over plain sequences.

use crate::case::IdiomCase;
use crate::digest::EqualityPolicy;
use crate::output::Output;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

#[must_use]
pub fn string_items(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("item{i}")).collect()
}

/// Grows the result without reserving, checking for the separator each time.
#[must_use]
pub fn join_by_concatenation(items: &[String]) -> String {
    let mut result = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            result.push_str(", ");
        }
        result.push_str(item);
    }
    result
}

#[must_use]
pub fn join_by_join(items: &[String]) -> String {
    items.join(", ")
}

pub fn string_join_case(n: usize) -> IdiomCase<Vec<String>> {
    IdiomCase::new(
        "string_join",
        "build a comma separated string by repeated appends vs join",
        EqualityPolicy::Exact,
        move || Ok(string_items(n)),
        |items| Ok(Output::Text(join_by_concatenation(&items))),
    )
    .candidate("join", |items| Ok(Output::Text(join_by_join(&items))))
}

#[must_use]
pub fn sum_of_squares_materialized(n: u64) -> i128 {
    let mut squares = Vec::new();
    for x in 0..n {
        let x = i128::from(x);
        squares.push(x * x);
    }
    squares.iter().sum()
}

#[must_use]
pub fn sum_of_squares_streaming(n: u64) -> i128 {
    (0..n).map(i128::from).map(|x| x * x).sum()
}

/// `sum(i^2 for i in 0..n)` without iterating.
#[must_use]
pub fn sum_of_squares_closed_form(n: u64) -> i128 {
    if n == 0 {
        return 0;
    }
    let n = i128::from(n);
    (n - 1) * n * (2 * n - 1) / 6
}

pub fn sum_of_squares_case(n: u64) -> IdiomCase<u64> {
    IdiomCase::new(
        "sum_of_squares",
        "sum of i^2 over 0..n: materialise the squares first vs stream them",
        EqualityPolicy::Exact,
        move || Ok(n),
        |n| Ok(Output::Int(sum_of_squares_materialized(n))),
    )
    .candidate("streaming_sum", |n| {
        Ok(Output::Int(sum_of_squares_streaming(n)))
    })
    .candidate("closed_form", |n| {
        Ok(Output::Int(sum_of_squares_closed_form(n)))
    })
}

/// `n` keys cycling through `distinct` values.
#[must_use]
pub fn repeated_keys(n: usize, distinct: usize) -> Vec<String> {
    let distinct = distinct.max(1);
    (0..n).map(|i| format!("item{}", i % distinct)).collect()
}

/// Counts by scanning a key list for every item.
#[must_use]
pub fn count_with_key_list(items: &[String]) -> Vec<(String, u64)> {
    let mut keys: Vec<String> = Vec::new();
    let mut counts: Vec<u64> = Vec::new();
    for item in items {
        match keys.iter().position(|k| k == item) {
            Some(pos) => counts[pos] += 1,
            None => {
                keys.push(item.clone());
                counts.push(1);
            }
        }
    }
    keys.into_iter().zip(counts).collect()
}

#[must_use]
pub fn count_with_hash_map(items: &[String]) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[must_use]
pub fn count_with_btree_map(items: &[String]) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub fn count_items_case(n: usize, distinct: usize) -> IdiomCase<Vec<String>> {
    IdiomCase::new(
        "count_items",
        "count occurrences with a linear key list vs a map",
        EqualityPolicy::Structural,
        move || Ok(repeated_keys(n, distinct)),
        |items| Ok(Output::Counts(count_with_key_list(&items))),
    )
    .candidate("hash_map_entry", |items| {
        Ok(Output::Counts(count_with_hash_map(&items)))
    })
    .candidate("btree_map_entry", |items| {
        Ok(Output::Counts(count_with_btree_map(&items)))
    })
}

static SHARED_TOTAL: AtomicI64 = AtomicI64::new(0);
static SHARED_TOTAL_OWNER: Mutex<()> = Mutex::new(());

/// Accumulates through process-wide state, one shared update per item.
#[must_use]
pub fn accumulate_shared(items: &[i64]) -> i64 {
    // Concurrent callers would otherwise interleave on the shared total.
    let _owner = SHARED_TOTAL_OWNER
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    SHARED_TOTAL.store(0, Ordering::SeqCst);
    for &item in items {
        SHARED_TOTAL.fetch_add(item, Ordering::SeqCst);
    }
    SHARED_TOTAL.load(Ordering::SeqCst)
}

#[must_use]
pub fn accumulate_local(items: &[i64]) -> i64 {
    let mut total = 0i64;
    for &item in items {
        total += item;
    }
    total
}

#[must_use]
pub fn accumulate_iter(items: &[i64]) -> i64 {
    items.iter().sum()
}

pub fn accumulator_case(n: usize) -> IdiomCase<Vec<i64>> {
    IdiomCase::new(
        "shared_vs_local_accumulator",
        "sum through a shared process-wide counter vs a local variable",
        EqualityPolicy::Exact,
        move || {
            let n = i64::try_from(n).map_err(|err| format!("item count: {err}"))?;
            Ok((0..n).collect::<Vec<i64>>())
        },
        |items: Vec<i64>| Ok(Output::Int(i128::from(accumulate_shared(&items)))),
    )
    .candidate("local_accumulator", |items: Vec<i64>| {
        Ok(Output::Int(i128::from(accumulate_local(&items))))
    })
    .candidate("iterator_sum", |items: Vec<i64>| {
        Ok(Output::Int(i128::from(accumulate_iter(&items))))
    })
}

#[cfg(test)]
mod tests {
    use super::{
        accumulate_iter, accumulate_local, accumulate_shared, accumulator_case,
        count_with_btree_map, count_with_hash_map, count_with_key_list, join_by_concatenation,
        join_by_join, repeated_keys, string_items, sum_of_squares_closed_form,
        sum_of_squares_materialized, sum_of_squares_streaming,
    };

    #[test]
    fn sum_of_squares_known_value() {
        assert_eq!(sum_of_squares_materialized(10_000), 333_283_335_000);
        assert_eq!(sum_of_squares_streaming(10_000), 333_283_335_000);
        assert_eq!(sum_of_squares_closed_form(10_000), 333_283_335_000);
        assert_eq!(sum_of_squares_closed_form(0), 0);
        assert_eq!(sum_of_squares_closed_form(1), 0);
        assert_eq!(sum_of_squares_streaming(3), 5);
    }

    #[test]
    fn joins_agree() {
        let items = string_items(4);
        assert_eq!(join_by_concatenation(&items), "item0, item1, item2, item3");
        assert_eq!(join_by_join(&items), join_by_concatenation(&items));
        assert_eq!(join_by_concatenation(&[]), "");
    }

    #[test]
    fn counters_agree_as_multisets() {
        let items = repeated_keys(250, 7);
        let mut slow = count_with_key_list(&items);
        let mut hashed = count_with_hash_map(&items);
        let btree = count_with_btree_map(&items);
        slow.sort();
        hashed.sort();
        assert_eq!(slow, hashed);
        assert_eq!(slow, btree);
        assert_eq!(slow.iter().map(|(_, c)| c).sum::<u64>(), 250);
    }

    #[test]
    fn key_list_keeps_first_seen_order() {
        let items: Vec<String> = ["b", "a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            count_with_key_list(&items),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn shared_accumulator_resets_between_calls() {
        let items: Vec<i64> = (0..1000).collect();
        assert_eq!(accumulate_shared(&items), 499_500);
        assert_eq!(accumulate_shared(&items), 499_500);
        assert_eq!(accumulate_local(&items), 499_500);
        assert_eq!(accumulate_iter(&items), 499_500);
    }

    #[test]
    fn accumulator_case_runs_every_candidate() {
        let report = crate::run_case(&accumulator_case(1000), &crate::RunOptions::check_only())
            .expect("run");
        assert_eq!(report.candidates.len(), 2);
        assert!(report.all_passed(), "{report:?}");
    }
}
