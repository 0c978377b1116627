/// Volunteer code generation
///
/// Codes are short enough to read over a counter and type by hand,
/// but carry enough randomness that collisions are a database-constraint
/// concern rather than an expected event.

use uuid::Uuid;

/// Number of characters in a volunteer code
pub const CODE_LEN: usize = 7;

/// Digits used for the code (uppercase base-36)
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a new volunteer code.
///
/// The code is derived from a v4 UUID (122 random bits) re-encoded in
/// base-36 and truncated to 7 digits. Truncation means collisions are
/// possible in principle; the store's UNIQUE constraint on the code
/// column is the final arbiter, not this function.
pub fn generate() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(CODE_LEN);

    for _ in 0..CODE_LEN {
        code.push(ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format() {
        for _ in 0..100 {
            let code = generate();
            assert_eq!(code.len(), CODE_LEN);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
                "unexpected character in code: {}",
                code
            );
        }
    }

    #[test]
    fn test_no_collisions_at_expected_population() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate()), "collision within 10k codes");
        }
    }
}
