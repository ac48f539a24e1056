//! Applying edit actions to a single channel

use super::bridge::{bridge_segment, find_neighbor};
use crate::audit::EditAction;
use crate::error::{Result, TraceError};
use crate::types::EditOp;

/// How an action landed on the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Applied as requested
    Applied,
    /// A connect edit had no neighbor on one side and blanked the span
    NanFallback,
}

/// Check that every index of `action` addresses a sample of a series of
/// length `len`
pub fn check_bounds(action: &EditAction, len: usize) -> Result<()> {
    // Indices are sorted, so the last one is the largest
    match action.last_index() {
        Some(index) if index >= len => Err(TraceError::IndexOutOfRange { index, len }),
        _ => Ok(()),
    }
}

/// Apply one action to `clean` in place.
///
/// The caller must have run [`check_bounds`] first.
pub fn apply_edit(time: &[f64], raw: &[f64], clean: &mut [f64], action: &EditAction) -> EditOutcome {
    let indices = action.indices();
    if indices.is_empty() {
        return EditOutcome::Applied;
    }

    match action.op() {
        EditOp::DeletePoints => {
            for &i in indices {
                clean[i] = f64::NAN;
            }
            EditOutcome::Applied
        }
        EditOp::RestorePoints => {
            for &i in indices {
                clean[i] = raw[i];
            }
            EditOutcome::Applied
        }
        EditOp::ConnectAcross => connect_across(time, raw, clean, action),
    }
}

/// Blank the samples of `action` without attempting a bridge
pub fn blank(clean: &mut [f64], action: &EditAction) {
    for &i in action.indices() {
        clean[i] = f64::NAN;
    }
}

fn connect_across(time: &[f64], raw: &[f64], clean: &mut [f64], action: &EditAction) -> EditOutcome {
    let indices = action.indices();
    let (first, last) = (indices[0], indices[indices.len() - 1]);
    let left = find_neighbor(clean, first as isize - 1, -1, indices);
    let right = find_neighbor(clean, last as isize + 1, 1, indices);

    let (Some(left), Some(right)) = (left, right) else {
        blank(clean, action);
        return EditOutcome::NanFallback;
    };

    let bridged = bridge_segment(
        time,
        clean,
        raw,
        indices,
        left,
        right,
        action.params().connect_method(),
        indices,
    );
    for (&i, value) in indices.iter().zip(bridged) {
        clean[i] = value;
    }
    EditOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::EditParams;
    use crate::types::{Channel, ConnectMethod};

    fn action(op: EditOp, indices: &[usize]) -> EditAction {
        EditAction::new(Channel::Inner, op, indices.iter().copied(), (0.0, 0.0))
    }

    #[test]
    fn test_delete_then_connect() {
        let time = [0.0, 1.0, 2.0, 3.0, 4.0];
        let raw = [10.0, 11.0, 12.0, 13.0, 14.0];
        let mut clean = raw;

        apply_edit(&time, &raw, &mut clean, &action(EditOp::DeletePoints, &[2]));
        assert!(clean[2].is_nan());

        let outcome = apply_edit(
            &time,
            &raw,
            &mut clean,
            &action(EditOp::ConnectAcross, &[2])
                .with_params(EditParams::connect(ConnectMethod::Linear)),
        );
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(clean[2], 12.0);
    }

    #[test]
    fn test_connect_at_edge_falls_back() {
        let time = [0.0, 1.0, 2.0, 3.0];
        let raw = [1.0, 2.0, 3.0, 4.0];
        let mut clean = raw;
        let outcome = apply_edit(&time, &raw, &mut clean, &action(EditOp::ConnectAcross, &[0, 1]));
        assert_eq!(outcome, EditOutcome::NanFallback);
        assert!(clean[0].is_nan() && clean[1].is_nan());
        assert_eq!(clean[2], 3.0);
    }

    #[test]
    fn test_connect_skips_interior_gaps() {
        // Non-contiguous selection with a NaN outside it
        let time = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let raw = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut clean = [0.0, 1.0, f64::NAN, 3.0, f64::NAN, 5.0, 6.0];
        apply_edit(&time, &raw, &mut clean, &action(EditOp::ConnectAcross, &[2, 4]));
        assert_eq!(clean[2], 2.0);
        assert_eq!(clean[4], 4.0);
        assert_eq!(clean[3], 3.0);
    }

    #[test]
    fn test_restore_copies_raw() {
        let time = [0.0, 1.0, 2.0];
        let raw = [5.0, 6.0, 7.0];
        let mut clean = [f64::NAN, f64::NAN, 7.0];
        apply_edit(&time, &raw, &mut clean, &action(EditOp::RestorePoints, &[0, 1]));
        assert_eq!(clean, raw);
    }

    #[test]
    fn test_check_bounds() {
        let a = action(EditOp::DeletePoints, &[1, 5]);
        assert!(check_bounds(&a, 6).is_ok());
        assert!(matches!(
            check_bounds(&a, 5),
            Err(TraceError::IndexOutOfRange { index: 5, len: 5 })
        ));
        assert!(check_bounds(&action(EditOp::DeletePoints, &[]), 0).is_ok());
    }
}
