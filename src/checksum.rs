//! Two's-complement checksum used by IPMI LAN message headers and bodies.

fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Compute the IPMI checksum of `bytes`.
///
/// The result is chosen so that the bytes plus the checksum sum to zero modulo 256.
/// Empty input yields `0`.
pub fn checksum(bytes: &[u8]) -> u8 {
    sum(bytes).wrapping_neg()
}

/// Check `checksum_byte` against `bytes`.
///
/// Returns `false` for empty input: a checksum over nothing never guards anything.
pub fn verify_checksum(bytes: &[u8], checksum_byte: u8) -> bool {
    !bytes.is_empty() && sum(bytes).wrapping_add(checksum_byte) == 0
}
