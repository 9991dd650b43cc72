use futures::executor::block_on;
use pushflow::prelude::*;
use quickcheck::{quickcheck, TestResult};

// Synchronous sources complete inside `consume`, so blocking is immediate
fn run<T: Send + 'static>(stream: Stream<T>) -> Vec<T> {
    block_on(stream.collect()).unwrap()
}

quickcheck! {
    fn prop_compress_then_flatten_is_identity(xs: Vec<i32>) -> bool {
        run(from_iter(xs.clone()).compress().flatten()) == xs
    }

    fn prop_partition_then_flatten_is_identity(xs: Vec<i32>, size: usize) -> TestResult {
        let size = size % 16 + 1;
        let groups = run(from_iter(xs.clone()).partition(size));
        let all_full = groups.iter().rev().skip(1).all(|group| group.len() == size);
        let last_fits = groups
            .last()
            .map_or(true, |group| !group.is_empty() && group.len() <= size);
        let flattened: Vec<i32> = groups.into_iter().flatten().collect();
        TestResult::from_bool(all_full && last_fits && flattened == xs)
    }

    fn prop_limit_never_exceeds(k: u8) -> bool {
        let k = k as usize;
        let taken = run(integers(0, 1).limit(k));
        taken.len() == k && taken.iter().enumerate().all(|(i, v)| *v == i as i64)
    }

    fn prop_reduce_matches_iterator_sum(xs: Vec<i16>) -> bool {
        let xs: Vec<i64> = xs.into_iter().map(i64::from).collect();
        let expected: Vec<i64> = xs.iter().copied().reduce(|a, b| a + b).into_iter().collect();
        run(from_iter(xs.clone()).reduce(|a, b| a + b)) == expected
            && run(from_iter(xs).reduce_right(|a, b| a + b)) == expected
    }

    fn prop_scan_last_equals_fold(xs: Vec<i16>) -> TestResult {
        if xs.is_empty() {
            return TestResult::discard();
        }
        let xs: Vec<i64> = xs.into_iter().map(i64::from).collect();
        let scanned = run(from_iter(xs.clone()).scan(0, |a, b| a + b));
        let folded = run(from_iter(xs.clone()).fold(0, |a, b| a + b));
        TestResult::from_bool(scanned.len() == xs.len() + 1 && scanned.last() == folded.first())
    }

    fn prop_skip_and_tail_partition_input(xs: Vec<u8>, n: u8) -> bool {
        let n = n as usize;
        let skipped = run(from_iter(xs.clone()).skip(n));
        let tail = run(from_iter(xs.clone()).tail(xs.len().saturating_sub(n)));
        skipped == tail
    }
}

#[test]
fn test_sum_over_one_to_nine() {
    assert_eq!(run(range(1, 9, 1).reduce(|a, b| a + b)), vec![45]);
    assert_eq!(run(range(1, 9, 1).reduce_right(|a, b| a + b)), vec![45]);
}

#[test]
fn test_reduce_direction_with_concatenation() {
    let concat = |mut a: Vec<i32>, b: Vec<i32>| {
        a.extend(b);
        a
    };
    let lists = vec![vec![1, 2], vec![3, 4]];
    assert_eq!(run(from_iter(lists.clone()).reduce(concat)), vec![vec![1, 2, 3, 4]]);
    assert_eq!(run(from_iter(lists).reduce_right(concat)), vec![vec![3, 4, 1, 2]]);
}

#[test]
fn test_scan_with_and_without_seed() {
    assert_eq!(run(from_iter(vec![1, 2, 3]).scan(0, |a, b| a + b)), vec![0, 1, 3, 6]);
    assert_eq!(run(from_iter(vec![1, 2, 3]).scan_reduce(|a, b| a + b)), vec![1, 3, 6]);
}
