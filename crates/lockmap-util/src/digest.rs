/// BLAKE3 digest of a byte slice, hex-encoded.
///
/// Used to fingerprint emitted import maps so two runs can be compared from
/// their logs alone.
#[must_use]
pub fn blake3_hex(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// First `len` hex characters of [`blake3_hex`].
#[must_use]
pub fn short_digest(data: &[u8], len: usize) -> String {
    let mut hex = blake3_hex(data);
    hex.truncate(len);
    hex
}
