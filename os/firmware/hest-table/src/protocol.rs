use crate::{HestError, HestTable};
use firmware_acpi::AcpiOemInfo;
use uefi::Status;

/// Handle returned by the ACPI table installer for a published table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AcpiTableKey(pub usize);

/// Installs finished ACPI tables for the operating system.
pub trait AcpiTablePublisher {
    /// Copies `table` into the platform's ACPI table list.
    ///
    /// # Errors
    /// The installer's status; the caller keeps its copy of the table.
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<AcpiTableKey, Status>;
}

impl<T: AcpiTablePublisher + ?Sized> AcpiTablePublisher for &mut T {
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<AcpiTableKey, Status> {
        (**self).install_acpi_table(table)
    }
}

/// Service offered to drivers that contribute error sources to the HEST.
pub trait HestTableProtocol {
    /// Appends `count` descriptors from the first `length` bytes of `descriptors`.
    ///
    /// # Errors
    /// See [`HestTable::append`].
    fn append_error_source_descriptors(
        &mut self,
        descriptors: &[u8],
        length: usize,
        count: usize,
    ) -> Result<(), HestError>;

    /// Publishes the table if any descriptors were added.
    ///
    /// # Errors
    /// See [`HestTable::install`].
    fn install_hest_table(&mut self) -> Result<(), HestError>;
}

/// The HEST table service: one table and the installer it will be handed to.
#[derive(Debug)]
pub struct HestDxe<P> {
    table: HestTable,
    publisher: P,
}

impl<P: AcpiTablePublisher> HestDxe<P> {
    #[must_use]
    pub const fn new(oem: AcpiOemInfo, publisher: P) -> Self {
        Self {
            table: HestTable::new(oem),
            publisher,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &HestTable {
        &self.table
    }

    #[must_use]
    pub const fn publisher(&self) -> &P {
        &self.publisher
    }

    #[must_use]
    pub fn into_publisher(self) -> P {
        self.publisher
    }
}

impl<P: AcpiTablePublisher> HestTableProtocol for HestDxe<P> {
    fn append_error_source_descriptors(
        &mut self,
        descriptors: &[u8],
        length: usize,
        count: usize,
    ) -> Result<(), HestError> {
        self.table.append(descriptors, length, count)
    }

    fn install_hest_table(&mut self) -> Result<(), HestError> {
        self.table.install(&mut self.publisher).map(|_| ())
    }
}

impl<T: HestTableProtocol + ?Sized> HestTableProtocol for &mut T {
    fn append_error_source_descriptors(
        &mut self,
        descriptors: &[u8],
        length: usize,
        count: usize,
    ) -> Result<(), HestError> {
        (**self).append_error_source_descriptors(descriptors, length, count)
    }

    fn install_hest_table(&mut self) -> Result<(), HestError> {
        (**self).install_hest_table()
    }
}
