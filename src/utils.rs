use rand::{rngs::StdRng, seq::IndexedRandom};

/// Picks one element uniformly at random.
///
/// # Parameters
/// - `items`: The elements to choose from.
/// - `rng`: A mutable reference to a `StdRng` instance. This allows for
///          reproducible sampling if the RNG is seeded.
///
/// # Returns
/// A copy of the chosen element, or `None` if `items` is empty.
pub fn pick_uniform<T: Copy>(items: &[T], rng: &mut StdRng) -> Option<T>{
    items.choose(rng).copied()
}

/// Returns the index of the first element with the highest score.
///
/// Ties keep the earliest element, so the result only depends on the
/// order of `items`. `NaN` scores never win.
pub fn argmax_first<T>(items: &[T], score: impl Fn(&T) -> f64) -> Option<usize>{
    let mut best: Option<(usize, f64)> = None;

    for (index, item) in items.iter().enumerate() {
        let value = score(item);
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, best_value)| value > best_value) {
            best = Some((index, value));
        }
    }

    best.map(|(index, _)| index)
}
