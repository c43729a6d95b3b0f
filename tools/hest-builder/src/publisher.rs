use hest_table::{AcpiTableKey, AcpiTablePublisher};
use log::{error, info};
use std::fs;
use std::path::PathBuf;
use uefi::Status;

/// Stands in for the ACPI table installer by writing the table to a file.
pub struct FilePublisher {
    path: PathBuf,
    installed: usize,
}

impl FilePublisher {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path, installed: 0 }
    }

    /// Number of tables written so far.
    #[must_use]
    pub const fn installed(&self) -> usize {
        self.installed
    }
}

impl AcpiTablePublisher for FilePublisher {
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<AcpiTableKey, Status> {
        if let Err(err) = fs::write(&self.path, table) {
            error!("Failed to write {}: {err}", self.path.display());
            return Err(Status::DEVICE_ERROR);
        }
        info!("Wrote {} bytes to {}", table.len(), self.path.display());
        self.installed += 1;
        Ok(AcpiTableKey(self.installed))
    }
}
