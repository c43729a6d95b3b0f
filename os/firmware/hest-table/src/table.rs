use crate::HestError;
use crate::protocol::{AcpiTableKey, AcpiTablePublisher};
use alloc::vec::Vec;
use firmware_acpi::{AcpiOemInfo, HestHeader, SdtHeader, checksum};
use log::{debug, error, info};

#[derive(Debug)]
enum TableState {
    /// No descriptor has been accepted yet.
    Empty,
    /// Header plus all descriptors appended so far.
    Building(Vec<u8>),
    /// Handed to the ACPI table installer; the buffer is gone.
    Installed,
}

/// The Hardware Error Source Table under construction.
#[derive(Debug)]
pub struct HestTable {
    oem: AcpiOemInfo,
    state: TableState,
}

impl HestTable {
    /// An empty table whose header will carry `oem` once it is synthesized.
    #[must_use]
    pub const fn new(oem: AcpiOemInfo) -> Self {
        Self {
            oem,
            state: TableState::Empty,
        }
    }

    /// Appends `count` error source descriptors occupying the first `length`
    /// bytes of `descriptors`.
    ///
    /// The first successful call creates the table header. Either the whole
    /// block is appended and the header updated, or nothing changes.
    ///
    /// # Errors
    /// * [`HestError::InvalidArgument`] if `descriptors` is empty, `length` is
    ///   zero or exceeds the slice, or the resulting count overflows 32 bits.
    /// * [`HestError::OutOfMemory`] if the table cannot grow or its length
    ///   would overflow 32 bits.
    /// * [`HestError::AlreadyInstalled`] after a successful [`HestTable::install`].
    pub fn append(
        &mut self,
        descriptors: &[u8],
        length: usize,
        count: usize,
    ) -> Result<(), HestError> {
        if descriptors.is_empty() || length == 0 || length > descriptors.len() {
            error!(
                "Rejecting {length} bytes of error source descriptors from a {} byte buffer",
                descriptors.len()
            );
            return Err(HestError::InvalidArgument);
        }
        if matches!(self.state, TableState::Installed) {
            return Err(HestError::AlreadyInstalled);
        }

        let current_len = match &self.state {
            TableState::Building(table) => table.len(),
            _ => HestHeader::SIZE,
        };
        let new_len = current_len
            .checked_add(length)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(HestError::OutOfMemory)?;
        let new_count = u32::try_from(count)
            .ok()
            .and_then(|count| self.error_source_count().checked_add(count))
            .ok_or(HestError::InvalidArgument)?;

        let table = self.reserve(length)?;
        table.extend_from_slice(&descriptors[..length]);
        patch_u32(table, SdtHeader::LENGTH_OFFSET, new_len);
        patch_u32(table, HestHeader::ERROR_SOURCE_COUNT_OFFSET, new_count);

        info!(
            "Added {count} error source descriptor(s), {length} bytes; \
             HEST now holds {new_count} in {new_len} bytes"
        );
        Ok(())
    }

    /// Computes the checksum and hands the table to `publisher`.
    ///
    /// Returns `Ok(None)` without calling the publisher if nothing was ever
    /// appended. On success the buffer is released; on failure the table is
    /// left exactly as it was and the call may be repeated.
    ///
    /// # Errors
    /// * [`HestError::Install`] with the publisher's status.
    /// * [`HestError::AlreadyInstalled`] after a previous successful install.
    pub fn install<P>(&mut self, publisher: &mut P) -> Result<Option<AcpiTableKey>, HestError>
    where
        P: AcpiTablePublisher + ?Sized,
    {
        let table = match &mut self.state {
            TableState::Empty => {
                info!("No error source descriptors were added; HEST not installed");
                return Ok(None);
            }
            TableState::Installed => return Err(HestError::AlreadyInstalled),
            TableState::Building(table) => table,
        };

        table[SdtHeader::CHECKSUM_OFFSET] = 0;
        table[SdtHeader::CHECKSUM_OFFSET] = checksum::checksum8(table);

        let len = table.len();
        match publisher.install_acpi_table(table) {
            Ok(key) => {
                info!("HEST installed ({len} bytes, key {})", key.0);
                self.state = TableState::Installed;
                Ok(Some(key))
            }
            Err(status) => {
                table[SdtHeader::CHECKSUM_OFFSET] = 0;
                error!("Failed to install the HEST: {status:?}");
                Err(HestError::Install(status))
            }
        }
    }

    /// Whether a table exists that [`HestTable::install`] would publish.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        matches!(self.state, TableState::Building(_))
    }

    /// Whether the table has been handed to the installer.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self.state, TableState::Installed)
    }

    /// Current table length including the header, or zero without a table.
    #[must_use]
    pub const fn len(&self) -> usize {
        match &self.state {
            TableState::Building(table) => table.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of descriptors appended so far.
    #[must_use]
    pub fn error_source_count(&self) -> u32 {
        HestHeader::read_from(self.as_bytes()).map_or(0, |hdr| hdr.error_source_count)
    }

    /// The table as it stands, empty if there is none.
    ///
    /// The checksum byte is only meaningful while an install is in progress.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.state {
            TableState::Building(table) => table,
            _ => &[],
        }
    }

    /// Makes room for `additional` descriptor bytes, creating the header first
    /// if necessary. Nothing changes on failure.
    fn reserve(&mut self, additional: usize) -> Result<&mut Vec<u8>, HestError> {
        if matches!(self.state, TableState::Empty) {
            let mut table = Vec::new();
            table
                .try_reserve_exact(HestHeader::SIZE + additional)
                .map_err(|_| HestError::OutOfMemory)?;
            table.extend_from_slice(&HestHeader::new(&self.oem).to_bytes());
            debug!("Created HEST header");
            self.state = TableState::Building(table);
        }

        let TableState::Building(table) = &mut self.state else {
            return Err(HestError::AlreadyInstalled);
        };
        table.try_reserve(additional).map_err(|_| HestError::OutOfMemory)?;
        Ok(table)
    }
}

impl Default for HestTable {
    fn default() -> Self {
        Self::new(AcpiOemInfo::default())
    }
}

fn patch_u32(table: &mut [u8], offset: usize, value: u32) {
    table[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
