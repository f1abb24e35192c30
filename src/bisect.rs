use std::future::Future;

use crate::error::{Result, SqliError};

/// Binary search over `(min, max]` against an oracle answering
/// `(val) < mid`. Terminates with `min` holding the extracted integer.
/// Mirrors the classic bisection described for `pysqli`'s blind
/// extraction engine.
pub async fn classic_bisect<F, Fut>(mut min: i64, mut max: i64, mut oracle: F) -> Result<i64>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    while max - min > 1 {
        let mid = (max + min) / 2;
        if oracle(mid).await? {
            max = mid;
        } else {
            min = mid;
        }
    }
    Ok(min)
}

/// Optimized 3-probe bisection: each round fires three concurrent oracle
/// calls and narrows the interval 4x. Falls back to the same decision
/// table regardless of how the three probes are dispatched, so the
/// caller's `probe` closure controls concurrency (e.g. via the pool).
///
/// `probe` receives `(mid_l, mid, mid_r)` and must return the three
/// answers `(a_l, a, a_r)` in that order.
pub async fn optimized_bisect<F, Fut>(mut min: i64, mut max: i64, mut probe: F) -> Result<i64>
where
    F: FnMut(i64, i64, i64) -> Fut,
    Fut: Future<Output = Result<(bool, bool, bool)>>,
{
    while max - min > 1 {
        let mid = (max + min) / 2;
        let mid_l = (mid + min) / 2;
        let mid_r = (max + mid) / 2;

        let (a_l, a, a_r) = probe(mid_l, mid, mid_r).await?;

        if !a {
            if !a_r {
                min = mid_r;
            } else {
                min = mid;
                max = mid_r;
            }
        } else if !a_l {
            min = mid_l;
            max = mid;
        } else {
            max = mid_l;
        }
    }
    Ok(min)
}

/// Wraps a bisection result with the outbound/overflow check from the
/// string-length extraction step: `len == limit_count_max - 1` is treated
/// as having hit the cap. `strict_outbound` switches the comparison to
/// `>=`, per the spec's Open Question (2) resolution.
pub fn check_outbound(value: i64, limit_count_max: i64, strict_outbound: bool) -> Result<i64> {
    let hit_cap = if strict_outbound {
        value >= limit_count_max - 1
    } else {
        value == limit_count_max - 1
    };
    if hit_cap {
        Err(SqliError::OutOfRange)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn classic_bisect_converges_to_true_value() {
        let true_value = 137;
        let result = classic_bisect(0, 256, |mid| async move { Ok(true_value < mid) })
            .await
            .unwrap();
        assert_eq!(result, true_value);
    }

    #[tokio::test]
    async fn classic_bisect_counts_rounds_within_log2_bound() {
        let true_value = 137i64;
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let result = classic_bisect(0, 256, move |mid| {
            calls_clone.set(calls_clone.get() + 1);
            async move { Ok(true_value < mid) }
        })
        .await
        .unwrap();
        assert_eq!(result, true_value);
        assert!(calls.get() <= 8);
    }

    #[tokio::test]
    async fn optimized_bisect_converges_to_true_value() {
        let true_value = 65;
        let result = optimized_bisect(0, 255, |mid_l, mid, mid_r| async move {
            Ok((true_value < mid_l, true_value < mid, true_value < mid_r))
        })
        .await
        .unwrap();
        assert_eq!(result, true_value);
    }

    #[tokio::test]
    async fn optimized_bisect_converges_in_few_rounds() {
        let true_value = 65i64;
        let rounds = Rc::new(Cell::new(0));
        let rounds_clone = rounds.clone();
        let result = optimized_bisect(0, 255, move |mid_l, mid, mid_r| {
            rounds_clone.set(rounds_clone.get() + 1);
            async move { Ok((true_value < mid_l, true_value < mid, true_value < mid_r)) }
        })
        .await
        .unwrap();
        assert_eq!(result, true_value);
        assert!(rounds.get() <= 4);
    }

    #[test]
    fn outbound_default_matches_exact_cap_minus_one() {
        assert!(check_outbound(499, 500, false).is_err());
        assert!(check_outbound(498, 500, false).is_ok());
    }

    #[test]
    fn outbound_strict_flags_anything_at_or_past_cap_minus_one() {
        assert!(check_outbound(499, 500, true).is_err());
        assert!(check_outbound(500, 500, true).is_err());
        assert!(check_outbound(498, 500, true).is_ok());
    }
}
