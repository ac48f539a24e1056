//! Inclusive index range compression for serialized edit logs

use serde_json::Value;

use crate::error::{Result, TraceError};

/// Largest index a stored log may name. Also caps the total number of
/// indices one entry may expand to.
pub const MAX_WIRE_INDEX: usize = i32::MAX as usize;

/// Collapse indices into sorted, inclusive `(start, end)` runs.
///
/// Duplicates are dropped and input order does not matter.
pub fn compress_indices(indices: &[usize]) -> Vec<(usize, usize)> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };

    let (mut start, mut prev) = (first, first);
    for idx in iter {
        if prev.checked_add(1) == Some(idx) {
            prev = idx;
            continue;
        }
        ranges.push((start, prev));
        start = idx;
        prev = idx;
    }
    ranges.push((start, prev));
    ranges
}

/// Expand inclusive ranges back into explicit indices.
///
/// Reversed pairs are swapped rather than rejected.
pub fn expand_ranges(ranges: &[(usize, usize)]) -> Vec<usize> {
    let mut values = Vec::new();
    for &(a, b) in ranges {
        let (start, end) = if b < a { (b, a) } else { (a, b) };
        values.extend(start..=end);
    }
    values
}

/// Read ranges as they appear in a serialized log.
///
/// Each entry is normally `[start, end]`. An empty entry is skipped and a
/// single value is a one-element range. Float values are truncated toward
/// zero. Negative values, indices past [`MAX_WIRE_INDEX`], and ranges that
/// together cover more than [`MAX_WIRE_INDEX`] samples are errors.
pub fn ranges_from_wire(entries: &[Vec<Value>]) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::with_capacity(entries.len());
    let mut total: usize = 0;
    for entry in entries {
        let (start, end) = match entry.as_slice() {
            [] => continue,
            [single] => (single, single),
            [start, end, ..] => (start, end),
        };
        let (start, end) = (wire_index(start)?, wire_index(end)?);
        total = total
            .checked_add(start.abs_diff(end) + 1)
            .filter(|&n| n <= MAX_WIRE_INDEX)
            .ok_or_else(|| {
                TraceError::Serialization(format!(
                    "edit ranges cover more than {} samples",
                    MAX_WIRE_INDEX
                ))
            })?;
        ranges.push((start, end));
    }
    Ok(ranges)
}

/// Ranges in their serialized `[start, end]` shape
pub fn ranges_to_wire(ranges: &[(usize, usize)]) -> Vec<Vec<Value>> {
    ranges
        .iter()
        .map(|&(start, end)| vec![Value::from(start), Value::from(end)])
        .collect()
}

fn wire_index(value: &Value) -> Result<usize> {
    let invalid = || TraceError::Serialization(format!("invalid edit index {}", value));
    let index = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => usize::try_from(u).map_err(|_| invalid())?,
            (None, Some(_), _) => return Err(invalid()),
            (None, None, Some(f)) if f.is_finite() && f > -1.0 => {
                let whole = f.trunc();
                if whole > MAX_WIRE_INDEX as f64 {
                    return Err(invalid());
                }
                whole as usize
            }
            _ => return Err(invalid()),
        },
        _ => return Err(invalid()),
    };
    if index > MAX_WIRE_INDEX {
        return Err(invalid());
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn wire(payload: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn test_compress_runs() {
        assert_eq!(
            compress_indices(&[5, 1, 2, 3, 9, 2, 10]),
            vec![(1, 3), (5, 5), (9, 10)]
        );
        assert!(compress_indices(&[]).is_empty());
    }

    #[test]
    fn test_compress_at_usize_max() {
        assert_eq!(
            compress_indices(&[usize::MAX - 1, usize::MAX, 0]),
            vec![(0, 0), (usize::MAX - 1, usize::MAX)]
        );
    }

    #[test]
    fn test_to_wire_never_negative() {
        let wire = ranges_to_wire(&[(usize::MAX, usize::MAX)]);
        assert_eq!(wire[0][0], json!(usize::MAX));
        assert!(wire[0][0].as_i64().is_none());
        // Too large to read back, rejected instead of wrapping
        assert!(ranges_from_wire(&wire).is_err());
    }

    #[test]
    fn test_expand_swaps_reversed() {
        assert_eq!(expand_ranges(&[(4, 2), (7, 7)]), vec![2, 3, 4, 7]);
    }

    #[test]
    fn test_wire_tolerates_malformed_entries() {
        let ranges = ranges_from_wire(&wire(json!([[3], [], [8, 6], [10, 11]]))).unwrap();
        assert_eq!(ranges, vec![(3, 3), (8, 6), (10, 11)]);
        assert_eq!(expand_ranges(&ranges), vec![3, 6, 7, 8, 10, 11]);
    }

    #[test]
    fn test_wire_rejects_negative() {
        assert!(ranges_from_wire(&wire(json!([[-1, 2]]))).is_err());
        assert!(ranges_from_wire(&wire(json!([[-0.5, 2]]))).is_ok());
        assert!(ranges_from_wire(&wire(json!([[-1.0, 2]]))).is_err());
    }

    #[test]
    fn test_wire_accepts_float_indices() {
        let ranges = ranges_from_wire(&wire(json!([[1.0, 3.0], [5.7, 6]]))).unwrap();
        assert_eq!(ranges, vec![(1, 3), (5, 6)]);
        assert!(ranges_from_wire(&wire(json!([["1", 2]]))).is_err());
    }

    #[test]
    fn test_wire_rejects_huge_ranges() {
        let err = ranges_from_wire(&wire(json!([[0, 1_000_000_000_000_000i64]]))).unwrap_err();
        assert!(matches!(err, TraceError::Serialization(_)));
        assert!(ranges_from_wire(&wire(json!([[0, 1e15]]))).is_err());

        // Each range is in bounds but together they cover too much
        let half = MAX_WIRE_INDEX / 2 + 1;
        assert!(ranges_from_wire(&wire(json!([[0, half], [0, half]]))).is_err());
        assert!(ranges_from_wire(&wire(json!([[0, MAX_WIRE_INDEX]]))).is_err());
    }

    proptest! {
        #[test]
        fn test_compress_expand_inverse(xs in prop::collection::vec(0usize..500, 0..200)) {
            let mut expected = xs.clone();
            expected.sort_unstable();
            expected.dedup();

            let expanded = expand_ranges(&compress_indices(&xs));
            prop_assert_eq!(expanded, expected);
        }

        #[test]
        fn test_compressed_runs_are_disjoint(xs in prop::collection::vec(0usize..500, 1..200)) {
            let ranges = compress_indices(&xs);
            for pair in ranges.windows(2) {
                // Adjacent runs would have been merged
                prop_assert!(pair[0].1 + 1 < pair[1].0);
            }
        }
    }
}
