//! # System Description Table Header

use crate::oem::AcpiOemInfo;
use crate::{AcpiLayoutError, ensure_len, read_u32_le};

/// Common header at the start of every ACPI table.
///
/// Fields are kept in host representation; [`SdtHeader::write_to`] and
/// [`SdtHeader::read_from`] perform the little-endian conversion so the layout
/// does not depend on target endianness or alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// The entire table, including this byte, must sum to zero.
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl SdtHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 36;

    /// Byte offset of [`SdtHeader::length`].
    pub const LENGTH_OFFSET: usize = 4;

    /// Byte offset of [`SdtHeader::checksum`].
    pub const CHECKSUM_OFFSET: usize = 9;

    /// A header of `length` bytes with a zero checksum.
    #[must_use]
    pub const fn new(signature: [u8; 4], revision: u8, length: u32, oem: &AcpiOemInfo) -> Self {
        Self {
            signature,
            length,
            revision,
            checksum: 0,
            oem_id: oem.oem_id(),
            oem_table_id: oem.oem_table_id(),
            oem_revision: oem.oem_revision(),
            creator_id: oem.creator_id(),
            creator_revision: oem.creator_revision(),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.signature);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8] = self.revision;
        buf[9] = self.checksum;
        buf[10..16].copy_from_slice(&self.oem_id);
        buf[16..24].copy_from_slice(&self.oem_table_id);
        buf[24..28].copy_from_slice(&self.oem_revision.to_le_bytes());
        buf[28..32].copy_from_slice(&self.creator_id.to_le_bytes());
        buf[32..36].copy_from_slice(&self.creator_revision.to_le_bytes());
        buf
    }

    /// Serializes the header into the first [`SdtHeader::SIZE`] bytes of `buf`.
    ///
    /// # Errors
    /// [`AcpiLayoutError::TooShort`] if `buf` cannot hold the header.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), AcpiLayoutError> {
        ensure_len(buf, Self::SIZE)?;
        buf[..Self::SIZE].copy_from_slice(&self.to_bytes());
        Ok(())
    }

    /// Reads a header from the start of `buf`.
    ///
    /// # Errors
    /// [`AcpiLayoutError::TooShort`] if `buf` is shorter than [`SdtHeader::SIZE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, AcpiLayoutError> {
        ensure_len(buf, Self::SIZE)?;
        let mut signature = [0; 4];
        signature.copy_from_slice(&buf[0..4]);
        let mut oem_id = [0; 6];
        oem_id.copy_from_slice(&buf[10..16]);
        let mut oem_table_id = [0; 8];
        oem_table_id.copy_from_slice(&buf[16..24]);

        Ok(Self {
            signature,
            length: read_u32_le(buf, 4),
            revision: buf[8],
            checksum: buf[9],
            oem_id,
            oem_table_id,
            oem_revision: read_u32_le(buf, 24),
            creator_id: read_u32_le(buf, 28),
            creator_revision: read_u32_le(buf, 32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_acpi_offsets() {
        let oem = AcpiOemInfo::new(*b"OEMID ", *b"TABLEID ", 0x1122_3344, 0x5566_7788, 0x99AA_BBCC);
        let hdr = SdtHeader::new(*b"TEST", 3, 0x0102_0304, &oem);

        let mut buf = [0u8; SdtHeader::SIZE];
        hdr.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], b"TEST");
        assert_eq!(&buf[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(buf[8], 3);
        assert_eq!(buf[SdtHeader::CHECKSUM_OFFSET], 0);
        assert_eq!(&buf[10..16], b"OEMID ");
        assert_eq!(&buf[16..24], b"TABLEID ");
        assert_eq!(&buf[24..28], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(&buf[32..36], &[0xCC, 0xBB, 0xAA, 0x99]);

        assert_eq!(SdtHeader::read_from(&buf).unwrap(), hdr);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let hdr = SdtHeader::new(*b"TEST", 1, 36, &AcpiOemInfo::default());
        let mut buf = [0u8; 35];
        assert_eq!(
            hdr.write_to(&mut buf),
            Err(AcpiLayoutError::TooShort {
                needed: 36,
                actual: 35
            })
        );
        assert!(SdtHeader::read_from(&buf).is_err());
    }
}
