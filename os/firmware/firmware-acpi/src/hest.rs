//! # Hardware Error Source Table Header
//!
//! ACPI 6.3, Table 18-382. The header is followed by `error_source_count`
//! error source descriptors whose combined size makes up the rest of
//! [`SdtHeader::length`].

use crate::oem::AcpiOemInfo;
use crate::sdt::SdtHeader;
use crate::{AcpiLayoutError, ensure_len, read_u32_le};

/// `"HEST"`
pub const HEST_SIGNATURE: [u8; 4] = *b"HEST";

/// HEST revision defined by ACPI 6.3.
pub const HEST_REVISION: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HestHeader {
    pub header: SdtHeader,
    /// Number of error source descriptors following the header.
    pub error_source_count: u32,
}

impl HestHeader {
    /// Size of the HEST header in bytes.
    pub const SIZE: usize = SdtHeader::SIZE + 4;

    /// Byte offset of [`HestHeader::error_source_count`].
    pub const ERROR_SOURCE_COUNT_OFFSET: usize = SdtHeader::SIZE;

    /// A header for a table without descriptors.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(oem: &AcpiOemInfo) -> Self {
        Self {
            header: SdtHeader::new(HEST_SIGNATURE, HEST_REVISION, Self::SIZE as u32, oem),
            error_source_count: 0,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..SdtHeader::SIZE].copy_from_slice(&self.header.to_bytes());
        buf[Self::ERROR_SOURCE_COUNT_OFFSET..]
            .copy_from_slice(&self.error_source_count.to_le_bytes());
        buf
    }

    /// Serializes the header into the first [`HestHeader::SIZE`] bytes of `buf`.
    ///
    /// # Errors
    /// [`AcpiLayoutError::TooShort`] if `buf` cannot hold the header.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), AcpiLayoutError> {
        ensure_len(buf, Self::SIZE)?;
        buf[..Self::SIZE].copy_from_slice(&self.to_bytes());
        Ok(())
    }

    /// Reads and validates a HEST header from the start of `buf`.
    ///
    /// # Errors
    /// * [`AcpiLayoutError::TooShort`] if `buf` is shorter than [`HestHeader::SIZE`].
    /// * [`AcpiLayoutError::BadSignature`] if the table is not a HEST.
    pub fn read_from(buf: &[u8]) -> Result<Self, AcpiLayoutError> {
        ensure_len(buf, Self::SIZE)?;
        let header = SdtHeader::read_from(buf)?;
        if header.signature != HEST_SIGNATURE {
            return Err(AcpiLayoutError::BadSignature(header.signature));
        }
        Ok(Self {
            header,
            error_source_count: read_u32_le(buf, Self::ERROR_SOURCE_COUNT_OFFSET),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;

    #[test]
    fn empty_header() {
        let hdr = HestHeader::new(&AcpiOemInfo::default());
        let bytes = hdr.to_bytes();
        assert_eq!(&bytes[0..4], b"HEST");
        assert_eq!(&bytes[4..8], &40u32.to_le_bytes());
        assert_eq!(bytes[8], HEST_REVISION);
        assert_eq!(&bytes[36..40], &[0, 0, 0, 0]);
        assert_eq!(HestHeader::read_from(&bytes).unwrap(), hdr);
    }

    #[test]
    fn header_checksum_round_trip() {
        let mut hdr = HestHeader::new(&AcpiOemInfo::default());
        hdr.error_source_count = 3;
        let mut bytes = hdr.to_bytes();
        bytes[SdtHeader::CHECKSUM_OFFSET] = checksum::checksum8(&bytes);
        assert!(checksum::is_valid(&bytes));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let mut bytes = HestHeader::new(&AcpiOemInfo::default()).to_bytes();
        bytes[0..4].copy_from_slice(b"BERT");
        assert_eq!(
            HestHeader::read_from(&bytes),
            Err(AcpiLayoutError::BadSignature(*b"BERT"))
        );
    }
}
