//! Benchmark utilities.

use kvmirror_sync_engine::{IdentifiedVec, Keyed};
use rand::seq::SliceRandom;
use rand::Rng;

/// Generate `count` keys mixing integers, padded integers and strings.
pub fn mixed_keys(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| match rng.gen_range(0..4) {
            0 => rng.gen_range(-1000..1000).to_string(),
            1 => format!("{:05}", rng.gen_range(0..1000)),
            2 => format!("key_{i}"),
            _ => rng.gen::<u64>().to_string(),
        })
        .collect()
}

/// Generate a keyed collection of `count` items.
pub fn keyed_state(count: usize) -> IdentifiedVec<Keyed<u64>> {
    (0..count)
        .map(|i| Keyed::new(i.to_string(), i as u64))
        .collect()
}

/// Derive a successor state: `changes` items updated, removed and added,
/// with the survivors shuffled.
pub fn mutate_state(state: &IdentifiedVec<Keyed<u64>>, changes: usize) -> IdentifiedVec<Keyed<u64>> {
    let mut rng = rand::thread_rng();
    let mut items: Vec<Keyed<u64>> = state.iter().skip(changes).cloned().collect();
    for item in items.iter_mut().take(changes) {
        item.value += 1;
    }
    items.shuffle(&mut rng);
    let base = state.len();
    items.extend((0..changes).map(|i| Keyed::new((base + i).to_string(), 0)));
    items.into_iter().collect()
}
