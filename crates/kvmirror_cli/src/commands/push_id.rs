//! Push-id command implementation.

use kvmirror_storage::PushIdGenerator;

/// Generates `count` ids from one generator, so they are strictly increasing.
pub fn generate(count: usize) -> Vec<String> {
    let generator = PushIdGenerator::new();
    (0..count).map(|_| generator.generate()).collect()
}

/// Runs the push-id command.
pub fn run(count: usize) {
    for id in generate(count) {
        println!("{id}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmirror_storage::PUSH_ID_LEN;

    #[test]
    fn ids_are_sorted_and_unique() {
        let ids = generate(50);
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| id.len() == PUSH_ID_LEN));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(generate(0).is_empty());
    }
}
