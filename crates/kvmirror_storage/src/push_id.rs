//! Chronologically sortable keys for tree-store `add`.
//!
//! A push id is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. Ids generated within the same millisecond increment the random
//! part, so ids from one generator are strictly increasing.

use parking_lot::Mutex;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Alphabet in ascending byte order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Length of every generated id.
pub const PUSH_ID_LEN: usize = TIME_CHARS + RANDOM_CHARS;

/// Generates push ids.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: Option<u64>,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates an id for the current wall-clock time.
    pub fn generate(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.generate_at(millis)
    }

    /// Generates an id for the given Unix time in milliseconds.
    pub fn generate_at(&self, millis: u64) -> String {
        let mut state = self.state.lock();
        if state.last_millis == Some(millis) {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            state.last_millis = Some(millis);
        }

        let mut id = String::with_capacity(PUSH_ID_LEN);
        let mut time_chars = [0u8; TIME_CHARS];
        let mut remaining = millis;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&c| c as char));
        id.extend(state.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }
}

/// Adds one to a base-64 digit string, carrying leftwards.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
