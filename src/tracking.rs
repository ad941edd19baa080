//! Tracking codes handed to complainants after submission.
//!
//! Codes are generated before the write reaches the queue, so a grievance
//! that is still buffered already has the code the user was shown.

use rand::Rng;

/// Unambiguous alphabet: no `I`, `O`, `0` or `1`.
pub const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a tracking code.
pub const TRACKING_CODE_LEN: usize = 12;

/// Generate a fresh random tracking code.
#[must_use]
pub fn generate_tracking_code() -> String {
    let mut rng = rand::thread_rng();
    (0..TRACKING_CODE_LEN)
        .map(|_| TRACKING_ALPHABET[rng.gen_range(0..TRACKING_ALPHABET.len())] as char)
        .collect()
}

/// Normalize user input for lookup: trimmed and uppercased.
#[must_use]
pub fn normalize_tracking_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}
