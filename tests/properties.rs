use phased_radix::{sort_with, Scheduler};
use proptest::prelude::*;

fn sorted_copy(values: &[u64]) -> Vec<u64> {
    let mut v = values.to_vec();
    v.sort_unstable();
    v
}

proptest! {
    // Every run spawns `base + 1` threads, keep the case count modest.
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_output_is_sorted_permutation(
        base in 2usize..=12,
        values in prop::collection::vec(0u64..100_000, 1..64),
    ) {
        let outcome = sort_with(base, &values, Scheduler::Raw).unwrap();
        prop_assert_eq!(outcome.sorted, sorted_copy(&values));
    }

    #[test]
    fn prop_sorting_is_idempotent(
        base in 2usize..=10,
        values in prop::collection::vec(0u64..5_000, 1..40),
    ) {
        let once = sort_with(base, &values, Scheduler::Rayon).unwrap().sorted;
        let twice = sort_with(base, &once, Scheduler::Rayon).unwrap().sorted;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_run_terminates_after_passes_plus_one_rounds(
        base in 2usize..=16,
        values in prop::collection::vec(0u64..1_000_000, 1..32),
    ) {
        let outcome = sort_with(base, &values, Scheduler::Raw).unwrap();
        prop_assert_eq!(outcome.barrier_rounds, outcome.passes.len() + 1);
        for pass in &outcome.passes {
            let mut running = 0;
            for (count, offset) in pass.counts.iter().zip(&pass.offsets) {
                prop_assert_eq!(*offset, running);
                running += count;
            }
            prop_assert_eq!(running, values.len());
        }
    }

    #[test]
    fn prop_idle_workers_never_scan(
        base in 3usize..=20,
        len in 1usize..3,
        seed in any::<u64>(),
    ) {
        let values: Vec<u64> = (0..len as u64).map(|i| seed.wrapping_mul(i + 1) >> 12).collect();
        let outcome = sort_with(base, &values, Scheduler::Raw).unwrap();
        for worker in &outcome.workers[len..] {
            prop_assert!(worker.scanned.iter().all(|&s| s == 0));
        }
    }
}

#[test]
fn sorted_array_line() {
    let outcome = sort_with(10, &[54, 21, 32, 3, 10], Scheduler::Raw).unwrap();
    assert_eq!(
        phased_radix::SortedArray(&outcome.sorted).to_string(),
        "Sorted array: 3 10 21 32 54"
    );
}
