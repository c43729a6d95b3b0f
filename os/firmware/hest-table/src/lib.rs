//! # HEST Aggregation
//!
//! Drivers discover their error sources at different times during boot. This
//! crate collects their descriptor blobs into a single Hardware Error Source
//! Table and hands that table, exactly once, to the platform's ACPI table
//! installer.
//!
//! ## Lifecycle
//!
//! ```text
//!            append()               append()
//!   Empty ───────────► Building ◄──────────┐
//!     │                   │  └─────────────┘
//!     │ install()         │ install() ok
//!     ▼                   ▼
//!  (nothing)          Installed
//! ```
//!
//! * The header is synthesized on the first successful [`HestTable::append`].
//! * Every append grows the table by exactly the appended bytes and keeps the
//!   header's length and error source count consistent with the contents.
//! * [`HestTable::install`] stamps the checksum and publishes. A failed
//!   publication leaves the table unchanged so the install can be retried.
//!
//! Firmware drivers reach the aggregator through [`HestTableProtocol`],
//! implemented by [`HestDxe`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod protocol;
mod table;

pub use protocol::{AcpiTableKey, AcpiTablePublisher, HestDxe, HestTableProtocol};
pub use table::HestTable;

use uefi::Status;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum HestError {
    /// Empty descriptor slice, zero length, a length exceeding the slice, or
    /// an error source count that no longer fits the header.
    #[error("Invalid error source descriptors")]
    InvalidArgument,
    /// The table could not grow, or its length would exceed 32 bits.
    #[error("Out of memory while growing the HEST")]
    OutOfMemory,
    #[error("The HEST has already been installed")]
    AlreadyInstalled,
    /// The ACPI table installer rejected the table.
    #[error("Failed to install the HEST: {0:?}")]
    Install(Status),
}

impl From<HestError> for Status {
    fn from(err: HestError) -> Self {
        match err {
            HestError::InvalidArgument => Self::INVALID_PARAMETER,
            HestError::OutOfMemory => Self::OUT_OF_RESOURCES,
            HestError::AlreadyInstalled => Self::ALREADY_STARTED,
            HestError::Install(status) => status,
        }
    }
}
