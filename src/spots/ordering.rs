// Selection ordering over a spot collection.
//
// Every operation takes the caller's collection by reference and returns a
// new one; nothing here mutates in place. A collection whose selected spots
// carry dense indices 0..k-1 comes back out the same way.

use std::collections::HashMap;

use super::Spot;

/// Selected spots in ascending index order.
///
/// This is a view, not a copy: recompute it from the collection whenever it
/// is needed rather than storing it next to the collection.
pub fn projection(spots: &[Spot]) -> Vec<&Spot> {
    let mut selected: Vec<&Spot> = spots.iter().filter(|spot| spot.is_selected).collect();
    selected.sort_by_key(|spot| spot.index.unwrap_or(usize::MAX));
    selected
}

/// Move the selected spot `moved` into the slot currently held by the
/// selected spot `target`, then renumber the selection.
///
/// Spots between the two positions shift by one. If the names are equal or
/// either one is not part of the selection the collection is returned as is.
pub fn reorder(spots: &[Spot], moved: &str, target: &str) -> Vec<Spot> {
    if moved == target {
        return spots.to_vec();
    }

    let mut order = projection(spots);
    let from = order.iter().position(|spot| spot.name == moved);
    let to = order.iter().position(|spot| spot.name == target);
    let (Some(from), Some(to)) = (from, to) else {
        tracing::debug!(moved, target, "reorder endpoint not in selection, ignoring");
        return spots.to_vec();
    };

    let spot = order.remove(from);
    order.insert(to, spot);

    merge_ranks(spots, &order)
}

/// Deselect every spot and clear its index.
pub fn reset(spots: &[Spot]) -> Vec<Spot> {
    spots.iter().map(Spot::deselected).collect()
}

/// Flip the selection of the spot called `name`.
///
/// Selecting appends the spot after the current selection. Deselecting
/// closes the gap so the remaining spots keep their relative order. Unknown
/// names leave the collection unchanged.
pub fn toggle(spots: &[Spot], name: &str) -> Vec<Spot> {
    let Some(spot) = spots.iter().find(|spot| spot.name == name) else {
        tracing::debug!(name, "toggle for unknown spot, ignoring");
        return spots.to_vec();
    };

    if spot.is_selected {
        let remaining: Vec<&Spot> = projection(spots)
            .into_iter()
            .filter(|spot| spot.name != name)
            .collect();
        merge_ranks(spots, &remaining)
            .into_iter()
            .map(|spot| if spot.name == name { spot.deselected() } else { spot })
            .collect()
    } else {
        let next = spots.iter().filter(|spot| spot.is_selected).count();
        spots
            .iter()
            .map(|spot| if spot.name == name { spot.at(next) } else { spot.clone() })
            .collect()
    }
}

// One pass over the collection: spots named in `order` take their position
// in it as the new index, everything else passes through.
fn merge_ranks(spots: &[Spot], order: &[&Spot]) -> Vec<Spot> {
    let ranks: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(rank, spot)| (spot.name.as_str(), rank))
        .collect();

    spots
        .iter()
        .map(|spot| match ranks.get(spot.name.as_str()) {
            Some(&rank) => spot.at(rank),
            None => spot.clone(),
        })
        .collect()
}
