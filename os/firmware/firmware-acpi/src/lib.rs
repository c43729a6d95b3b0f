//! # ACPI Table Layouts for Firmware-Built Tables
//!
//! This crate provides the byte-exact layouts firmware needs when it *builds*
//! ACPI tables for the operating system, as opposed to parsing tables handed
//! over by firmware. It focuses on the Hardware Error Source Table (HEST) and
//! the pieces it is made of.
//!
//! ## Overview
//!
//! Every ACPI table starts with the 36-byte System Description Table header
//! and must byte-sum to zero. The HEST extends that header with a 32-bit error
//! source count and is followed by a contiguous sequence of error source
//! descriptors:
//!
//! ```text
//! offset  size  field
//! ──────  ────  ─────────────────────────────
//!      0     4  Signature ("HEST")
//!      4     4  Length (header + descriptors)
//!      8     1  Revision
//!      9     1  Checksum
//!     10     6  OEM ID
//!     16     8  OEM Table ID
//!     24     4  OEM Revision
//!     28     4  Creator ID
//!     32     4  Creator Revision
//!     36     4  Error Source Count
//!     40     …  Error source descriptors
//! ```
//!
//! ## Key Components
//!
//! ### SDT Header ([`sdt::SdtHeader`])
//! Little-endian (de)serialization of the common table header, independent of
//! target layout or alignment.
//!
//! ### Checksums ([`checksum`])
//! * **Sum**: wrapping 8-bit sum of a byte range
//! * **Checksum**: the byte that brings a table's sum to zero
//! * **Validation**: whole-table verification
//!
//! ### HEST Header ([`hest::HestHeader`])
//! The HEST-specific header, including the offsets at which an incrementally
//! built table patches its length and error source count.
//!
//! ### Table Identity ([`oem::AcpiOemInfo`])
//! OEM and creator identification stamped into every table the firmware
//! publishes, with EDK2-compatible defaults.
//!
//! ### GHESv2 Descriptors ([`ghes`])
//! Encoders for Generic Hardware Error Source (version 2) descriptors, the
//! notification structure and the Generic Address Structure. Error source
//! producers use these to build their descriptor blobs; the table builder
//! itself treats descriptors as opaque bytes.
//!
//! ## Standards Compliance
//!
//! * **ACPI 6.3, Table 18-382**: Hardware Error Source Table
//! * **ACPI 6.3, Table 18-393**: Generic Hardware Error Source version 2
//! * **ACPI 6.3, Table 18-394**: Hardware Error Notification Structure
//! * **ACPI 6.3, Section 5.2.3.2**: Generic Address Structure

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod ghes;
pub mod hest;
pub mod oem;
pub mod sdt;

pub use hest::HestHeader;
pub use oem::AcpiOemInfo;
pub use sdt::SdtHeader;

/// Errors raised while encoding or decoding ACPI layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AcpiLayoutError {
    #[error("Buffer too short: needed {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("Unexpected table signature {0:?}")]
    BadSignature([u8; 4]),
    #[error("Identifier must be ASCII and at most {max} bytes long")]
    InvalidIdentifier { max: usize },
}

/// Fails with [`AcpiLayoutError::TooShort`] unless `buf` holds at least `needed` bytes.
pub(crate) const fn ensure_len(buf: &[u8], needed: usize) -> Result<(), AcpiLayoutError> {
    if buf.len() < needed {
        return Err(AcpiLayoutError::TooShort {
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

#[inline]
pub(crate) fn read_u32_le(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
