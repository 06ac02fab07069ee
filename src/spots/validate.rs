use std::collections::HashSet;

use super::{Spot, SpotError};

/// Check the preconditions the ordering operations rely on: unique names,
/// index present exactly when selected, and selected indices forming 0..k-1.
///
/// The ordering functions never call this themselves. Run it wherever a
/// collection enters from outside.
pub fn validate(spots: &[Spot]) -> Result<(), SpotError> {
    let mut seen = HashSet::with_capacity(spots.len());
    let mut indices = Vec::new();

    for spot in spots {
        if !seen.insert(spot.name.as_str()) {
            return Err(SpotError::DuplicateName(spot.name.clone()));
        }
        match (spot.is_selected, spot.index) {
            (true, Some(index)) => indices.push(index),
            (true, None) => return Err(SpotError::SelectionWithoutIndex(spot.name.clone())),
            (false, Some(_)) => return Err(SpotError::IndexWithoutSelection(spot.name.clone())),
            (false, None) => {}
        }
    }

    indices.sort_unstable();
    if indices.iter().enumerate().any(|(rank, &index)| rank != index) {
        return Err(SpotError::IndexNotDense {
            expected: indices.len(),
            found: indices,
        });
    }

    Ok(())
}
