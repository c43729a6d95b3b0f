//! # Table Identity
//!
//! OEM and creator identification written into the header of every table the
//! firmware publishes.

use crate::AcpiLayoutError;
use utils_accessors_derive::Accessors;

/// OEM and creator fields of an ACPI table header.
///
/// The identifiers are fixed-width and space-padded; they are not
/// NUL-terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Accessors)]
pub struct AcpiOemInfo {
    /// OEM identification (`OEMID`).
    oem_id: [u8; 6],
    /// Manufacturer model identification (`OEM Table ID`).
    oem_table_id: [u8; 8],
    /// OEM revision of the table for the given OEM table ID.
    oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    creator_id: u32,
    /// Revision of the utility that created the table.
    creator_revision: u32,
}

impl AcpiOemInfo {
    /// The EDK2 platform defaults (`PcdAcpiDefault*`).
    pub const EDK2_DEFAULT: Self = Self {
        oem_id: *b"INTEL ",
        oem_table_id: *b"EDK2    ",
        oem_revision: 0x0000_0002,
        creator_id: u32::from_le_bytes(*b"    "),
        creator_revision: 0x0100_0013,
    };

    #[must_use]
    pub const fn new(
        oem_id: [u8; 6],
        oem_table_id: [u8; 8],
        oem_revision: u32,
        creator_id: u32,
        creator_revision: u32,
    ) -> Self {
        Self {
            oem_id,
            oem_table_id,
            oem_revision,
            creator_id,
            creator_revision,
        }
    }

    /// Replaces the OEM ID with `id`, space-padded to six bytes.
    ///
    /// # Errors
    /// [`AcpiLayoutError::InvalidIdentifier`] if `id` is not ASCII or longer than six bytes.
    pub fn try_with_oem_id(self, id: &str) -> Result<Self, AcpiLayoutError> {
        Ok(self.with_oem_id(padded_ascii(id)?))
    }

    /// Replaces the OEM table ID with `id`, space-padded to eight bytes.
    ///
    /// # Errors
    /// [`AcpiLayoutError::InvalidIdentifier`] if `id` is not ASCII or longer than eight bytes.
    pub fn try_with_oem_table_id(self, id: &str) -> Result<Self, AcpiLayoutError> {
        Ok(self.with_oem_table_id(padded_ascii(id)?))
    }
}

impl Default for AcpiOemInfo {
    fn default() -> Self {
        Self::EDK2_DEFAULT
    }
}

fn padded_ascii<const N: usize>(id: &str) -> Result<[u8; N], AcpiLayoutError> {
    if id.len() > N || !id.is_ascii() {
        return Err(AcpiLayoutError::InvalidIdentifier { max: N });
    }
    let mut out = [b' '; N];
    out[..id.len()].copy_from_slice(id.as_bytes());
    Ok(out)
}
