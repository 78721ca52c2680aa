use nanoid::nanoid;

/// Alphabet for record identifiers. Drops glyphs that read ambiguously
/// when an id ends up in a share message or a log line (0/O, 1/I/l).
const RECORD_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Record id length, matching the 20-character ids the hosted store hands out.
const RECORD_ID_LENGTH: usize = 20;

/// Generates a fresh record identifier for users, posts, friendships,
/// notifications, chats, and messages.
pub fn generate_record_id() -> String {
    nanoid!(RECORD_ID_LENGTH, RECORD_ID_ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_shape_is_stable() {
        let id = generate_record_id();
        assert_eq!(id.len(), RECORD_ID_LENGTH);
        assert!(id.chars().all(|c| RECORD_ID_ALPHABET.contains(&c)));
    }

    #[test]
    fn ids_do_not_collide_trivially() {
        let a = generate_record_id();
        let b = generate_record_id();
        assert_ne!(a, b);
    }
}
