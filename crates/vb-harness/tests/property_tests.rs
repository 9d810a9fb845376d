//! Property-based tests for idiom equivalence and speedup reporting.

use proptest::prelude::*;
use vb_harness::catalog::numeric::{
    doubled_by_arange, doubled_by_push, squares_by_power, squares_by_push,
};
use vb_harness::catalog::sequences::{
    count_with_hash_map, count_with_key_list, join_by_concatenation, join_by_join,
    sum_of_squares_closed_form, sum_of_squares_materialized, sum_of_squares_streaming,
};
use vb_harness::{
    EqualityPolicy, Output, Speedup, TIMER_RESOLUTION_SECONDS, compare_digests, digest_output,
    speedup_ratio,
};

fn arb_words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{0,6}", 0..40)
}

fn arb_keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")], 0..200)
        .prop_map(|keys| keys.into_iter().map(str::to_string).collect())
}

fn equivalent(a: &Output, b: &Output, policy: EqualityPolicy) -> bool {
    compare_digests(&digest_output(a, policy), &digest_output(b, policy), policy).is_ok()
}

proptest! {
    /// Squaring by appending and by elementwise power agree for every length.
    #[test]
    fn square_sequences_match(n in 0usize..2_000) {
        let slow = Output::Array(squares_by_push(n));
        let fast = Output::Array(squares_by_power(n));
        prop_assert!(equivalent(&slow, &fast, EqualityPolicy::Exact));
    }

    #[test]
    fn doubled_arrays_match(n in 0usize..2_000) {
        prop_assert_eq!(doubled_by_push(n), doubled_by_arange(n));
    }

    /// All three sum-of-squares strategies agree.
    #[test]
    fn sum_of_squares_strategies_match(n in 0u64..5_000) {
        let slow = sum_of_squares_materialized(n);
        prop_assert_eq!(slow, sum_of_squares_streaming(n));
        prop_assert_eq!(slow, sum_of_squares_closed_form(n));
    }

    #[test]
    fn joins_match(words in arb_words()) {
        prop_assert_eq!(join_by_concatenation(&words), join_by_join(&words));
    }

    /// Hash-map counting differs in order only, which the structural policy ignores.
    #[test]
    fn counts_match_structurally(keys in arb_keys()) {
        let slow = Output::Counts(count_with_key_list(&keys));
        let fast = Output::Counts(count_with_hash_map(&keys));
        prop_assert!(equivalent(&slow, &fast, EqualityPolicy::Structural));
    }

    /// Digests are a pure function of the output.
    #[test]
    fn digests_are_idempotent(values in prop::collection::vec(-1.0e6f64..1.0e6, 0..64)) {
        let out = Output::Floats(values);
        for policy in [
            EqualityPolicy::Exact,
            EqualityPolicy::Structural,
            EqualityPolicy::Tolerance { abs_tol: 1e-9, rel_tol: 1e-9 },
        ] {
            prop_assert_eq!(digest_output(&out, policy), digest_output(&out, policy));
        }
    }

    /// Sub-resolution candidates always yield the sentinel, never inf or NaN.
    #[test]
    fn speedup_never_leaks_non_finite(
        reference in 0.0f64..10.0,
        candidate in 0.0f64..1.0e-9,
    ) {
        prop_assert_eq!(speedup_ratio(reference, candidate), Speedup::TooFastToMeasure);
    }

    #[test]
    fn measurable_speedups_are_finite(
        reference in TIMER_RESOLUTION_SECONDS..10.0,
        candidate in TIMER_RESOLUTION_SECONDS..10.0,
    ) {
        match speedup_ratio(reference, candidate) {
            Speedup::Ratio(r) => prop_assert!(r.is_finite() && r >= 0.0),
            Speedup::TooFastToMeasure => prop_assert!(false, "unexpected sentinel"),
        }
    }

    #[test]
    fn unmeasurable_reference_never_reports_a_ratio(
        reference in 0.0f64..1.0e-9,
        candidate in TIMER_RESOLUTION_SECONDS..10.0,
    ) {
        prop_assert_eq!(speedup_ratio(reference, candidate), Speedup::TooFastToMeasure);
    }
}
