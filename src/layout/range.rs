//! Range invalidation: which measures changed and which systems they touch.

use std::ops::Range;

use crate::error::{LayoutError, LayoutResult};
use crate::fraction::Fraction;
use crate::model::Score;

/// Reject reversed ranges and ranges outside `[0, end]`.
pub(crate) fn check_range(score: &Score, from: Fraction, to: Fraction) -> LayoutResult<()> {
    let end = score.end_tick();
    if from > to || from.is_negative() || to > end {
        return Err(LayoutError::InvalidRange { from, to, end });
    }
    Ok(())
}

/// Measures overlapping `[from, to)`. An empty range marks the measure at
/// `from`, or the last measure when `from` is the score end. The result is
/// widened to the full extent of non-breakable spanners starting inside it.
pub(crate) fn dirty_measures(score: &Score, from: Fraction, to: Fraction) -> Range<usize> {
    let measures = score.measures();
    let n = measures.len();
    if n == 0 {
        return 0..0;
    }

    let mut first = measures.partition_point(|m| m.end_tick() <= from).min(n - 1);
    let mut last = measures.partition_point(|m| m.tick < to).max(first + 1);
    if from == to {
        first = score.measure_at(from).unwrap_or(n - 1);
        last = first + 1;
    }

    let reach = measures[first..last]
        .iter()
        .filter_map(|m| m.unbreakable_until())
        .max();
    if let Some(until) = reach {
        last = last.max(measures.partition_point(|m| m.tick < until));
    }
    first..last.min(n)
}

/// Old systems whose membership may change when `dirty` is laid out again:
/// those holding a dirty measure, plus a neighbour whose adjacent measure
/// across the boundary is dirty. Measures not yet assigned to a system
/// count as belonging to the last one.
pub(crate) fn affected_systems(score: &Score, dirty: &Range<usize>) -> Range<usize> {
    let systems = score.systems();
    let len = systems.len();
    if len == 0 || dirty.is_empty() {
        return 0..len;
    }
    let owner = |i: usize| score.system_of_measure(i).unwrap_or(len - 1);

    let mut lo = owner(dirty.start);
    if lo > 0 && systems[lo].measures.start == dirty.start {
        lo -= 1;
    }
    let mut hi = owner(dirty.end - 1);
    if hi + 1 < len && systems[hi].measures.end == dirty.end {
        hi += 1;
    }
    lo..hi + 1
}
