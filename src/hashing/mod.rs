use blake3::Hasher;

/// Hashes a normalized survey answer to a 32-byte BLAKE3 key.
#[inline]
pub fn hash_answer(answer: &str) -> [u8; 32] {
    *blake3::hash(answer.as_bytes()).as_bytes()
}

/// Hashes a `(category, answer)` pair into a single front-cache key.
///
/// The category is folded in with a separator so `("tea", "pot")` and
/// `("teapot", "")` cannot collide.
#[inline]
pub fn hash_namespace_key(category: &str, answer: &str) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(category.as_bytes());
    hasher.update(b"|");
    hasher.update(answer.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Truncation is acceptable here: the value is used for vector-store point ids
/// and log correlation, where a rare collision degrades to an extra cache miss,
/// never to data corruption. There is no cryptographic dependency on this hash.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
