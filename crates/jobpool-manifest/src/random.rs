//! DNS-safe random name suffixes

use rand::Rng;

/// Length of the suffix appended to worker Job names
pub const SUFFIX_LEN: usize = 5;

/// Characters valid anywhere in an RFC 1123 label
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a fresh lowercase alphanumeric suffix of [`SUFFIX_LEN`] characters
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_dns_safe() {
        for _ in 0..100 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
