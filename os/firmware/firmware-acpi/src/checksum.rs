//! # ACPI 8-bit Checksums
//!
//! A table is valid when all of its bytes, including the checksum byte, sum
//! to zero modulo 256.

/// Wrapping 8-bit sum of `bytes`.
#[must_use]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

/// The checksum byte for `bytes`.
///
/// The checksum field inside `bytes` must be zero while this is computed;
/// storing the result there makes [`is_valid`] hold for the whole range.
#[must_use]
pub fn checksum8(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(sum(bytes))
}

/// Whether `bytes` sum to zero.
#[must_use]
pub fn is_valid(bytes: &[u8]) -> bool {
    sum(bytes) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_wraps() {
        assert_eq!(sum(&[0xFF, 0x02]), 0x01);
        assert_eq!(sum(&[]), 0);
    }

    #[test]
    fn checksum_zeroes_the_sum() {
        let mut bytes = [0x48, 0x45, 0x53, 0x54, 0x00, 0x99, 0x10];
        bytes[4] = checksum8(&bytes);
        assert!(is_valid(&bytes));
    }

    #[test]
    fn all_zero_range_has_zero_checksum() {
        let bytes = [0u8; 40];
        assert_eq!(checksum8(&bytes), 0);
        assert!(is_valid(&bytes));
    }
}
