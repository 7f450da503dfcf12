use rand::{thread_rng, Rng};

/// Length of generated paste identifiers.
pub const ID_LEN: usize = 10;

/// URL-safe alphabet, 64 symbols.
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Generate a random, URL-safe paste identifier.
pub fn generate_id() -> String {
    let mut rng = thread_rng();
    (0..ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
