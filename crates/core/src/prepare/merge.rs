use std::borrow::Cow;

use crate::model::Value;

/// Collapse repeated states into change points.
///
/// Scanning left to right, a value strictly equal to the most recently
/// kept value becomes [`Value::Unset`]. `Null` is always kept and resets the
/// reference; `Unset` inputs are skipped without touching it.
///
/// Returns `Cow::Borrowed(values)` when nothing changes, so callers can
/// keep the original column.
pub fn unset_same_future_values(values: &[Value]) -> Cow<'_, [Value]> {
    let mut merged: Option<Vec<Value>> = None;
    let mut prev: Option<&Value> = None;

    for (i, value) in values.iter().enumerate() {
        match value {
            Value::Null => prev = None,
            Value::Unset => {}
            _ if prev.is_some_and(|p| p.strict_eq(value)) => {
                merged.get_or_insert_with(|| values.to_vec())[i] = Value::Unset;
            }
            _ => prev = Some(value),
        }
    }

    merged.map_or(Cow::Borrowed(values), Cow::Owned)
}

/// Index of the next sample after `index` holding a different state.
///
/// `Unset` cells and repeats of the state at `index` are skipped. `None`
/// means the state lasts to the end of the data.
pub fn find_next_state_index(values: &[Value], index: usize) -> Option<usize> {
    let start = values.get(index)?;
    values
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, v)| !v.is_unset() && !v.strict_eq(start))
        .map(|(i, _)| i)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Unset),
            Just(Value::Null),
            (0u8..4).prop_map(|n| Value::Number(f64::from(n))),
            prop::sample::select(vec!["a", "b"]).prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(values in prop::collection::vec(cell(), 0..40)) {
            let once = unset_same_future_values(&values).into_owned();
            prop_assert!(matches!(unset_same_future_values(&once), Cow::Borrowed(_)));
        }

        #[test]
        fn merge_keeps_length_and_nulls(values in prop::collection::vec(cell(), 0..40)) {
            let merged = unset_same_future_values(&values);
            prop_assert_eq!(merged.len(), values.len());
            for (before, after) in values.iter().zip(merged.iter()) {
                prop_assert_eq!(before.is_null(), after.is_null());
                if !after.is_unset() {
                    prop_assert_eq!(before, after);
                }
            }
        }

        #[test]
        fn no_adjacent_equal_states_survive(values in prop::collection::vec(cell(), 0..40)) {
            let merged = unset_same_future_values(&values);
            let kept: Vec<&Value> = merged.iter().filter(|v| !v.is_unset()).collect();
            for pair in kept.windows(2) {
                prop_assert!(!pair[0].strict_eq(pair[1]) || pair[0].is_null());
            }
        }
    }
}
