//! Dealing test items into hands, one hand per execution.
//!
//! The first hand is always the largest so that a submission cannot tell executions apart by
//! input size, and the items are shuffled first so that expected output order cannot be
//! hard-coded.

use rand::Rng;

/// Uniform Fisher-Yates shuffle drawing `j` from `[0, i]`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (0..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Splits `items` into uneven hands for `number_of_runs` executions.
///
/// With `cards = len / (number_of_runs + 1)` the first hand takes `ceil(2 * cards)` items and every
/// following hand spans `[ceil(i), ceil(i + cards) + 1)` for `i = 2 * cards, 3 * cards, ...`.
/// Adjacent later hands share their boundary item.
pub fn partition<T, R>(mut items: Vec<T>, shuffle: bool, number_of_runs: usize, rng: &mut R) -> Vec<Vec<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if shuffle {
        self::shuffle(&mut items, rng);
    }
    let bounds = hand_bounds(items.len(), number_of_runs);
    log::debug!(
        "Dealing {} items over {} runs: {:?}",
        items.len(),
        number_of_runs,
        bounds
    );
    bounds
        .into_iter()
        .map(|(start, end)| items[start..end].to_vec())
        .collect()
}

/// Half-open index ranges of every hand for `len` items. The first range is always present.
pub fn hand_bounds(len: usize, number_of_runs: usize) -> Vec<(usize, usize)> {
    let runs = number_of_runs.max(1);
    let total = len as f64;
    let cards_per_hand = total / (runs as f64 + 1.0);

    let first_end = ceil_index(cards_per_hand * 2.0).min(len);
    let mut bounds = vec![(0, first_end)];

    if cards_per_hand <= 0.0 {
        return bounds;
    }

    let mut i = cards_per_hand * 2.0;
    while i < total {
        let start = ceil_index(i).min(len);
        let end = (ceil_index(i + cards_per_hand) + 1).min(len);
        if start < end {
            bounds.push((start, end));
        }
        i += cards_per_hand;
    }
    bounds
}

fn ceil_index(x: f64) -> usize {
    x.ceil() as usize
}
