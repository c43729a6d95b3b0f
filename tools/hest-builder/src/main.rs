mod args;
mod logger;
mod publisher;

use crate::args::{Args, GhesSource};
use crate::logger::StderrLogger;
use crate::publisher::FilePublisher;
use clap::Parser;
use firmware_acpi::AcpiOemInfo;
use firmware_acpi::ghes::{GhesV2, HardwareErrorNotification, NotificationType};
use hest_dxe::{AppendOutcome, DxeError, append_mm_error_sources};
use hest_mm::{HestErrorSourceMmi, MmiDispatcher, ProducerTable, StaticErrorSources};
use hest_mm_abi::MM_HEST_GET_ERROR_SOURCE_INFO_GUID;
use hest_table::{HestDxe, HestError, HestTableProtocol};
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{fs, io};
use uefi::Status;

#[derive(Debug, thiserror::Error)]
enum BuildError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Invalid table identity: {0}")]
    Identity(#[from] firmware_acpi::AcpiLayoutError),
    #[error("GHES source {0}: read-ack register address overflows")]
    GhesAddress(u16),
    #[error("Failed to set up the MM collector: {0:?}")]
    Setup(Status),
    #[error(transparent)]
    Collect(#[from] DxeError),
    #[error(transparent)]
    Install(#[from] HestError),
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    if StderrLogger::new(level).init().is_err() {
        eprintln!("logger already initialized");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), BuildError> {
    let oem = table_identity(args)?;

    let producers = ProducerTable::new();
    for file in &args.descriptors {
        let bytes = fs::read(&file.path).map_err(|source| BuildError::Read {
            path: file.path.clone(),
            source,
        })?;
        info!(
            "{}: {} descriptor(s), {} bytes",
            file.path.display(),
            file.count,
            bytes.len()
        );
        let _ = producers.install(StaticErrorSources::new(bytes, file.count));
    }
    for source in &args.ghes {
        let ghes = ghes_descriptor(source)?;
        let producer = StaticErrorSources::ghes_v2(&[ghes]).map_err(BuildError::Setup)?;
        let _ = producers.install(producer);
    }

    let handler = HestErrorSourceMmi::new(&producers);
    let mut mm = MmiDispatcher::new();
    mm.register(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, &handler)
        .map_err(BuildError::Setup)?;

    let mut hest = HestDxe::new(oem, FilePublisher::new(args.output.clone()));
    if let AppendOutcome::Appended { count, length } = append_mm_error_sources(&mm, &mut hest)? {
        info!("Collected {count} error source(s), {length} bytes");
    }

    let length = hest.table().len();
    let count = hest.table().error_source_count();
    hest.install_hest_table()?;

    if hest.publisher().installed() == 0 {
        info!("No error sources; nothing written");
    } else {
        info!(
            "HEST with {count} error source(s), {length} bytes written to {}",
            args.output.display()
        );
    }
    Ok(())
}

fn table_identity(args: &Args) -> Result<AcpiOemInfo, BuildError> {
    let mut oem = AcpiOemInfo::default();
    if let Some(id) = &args.oem_id {
        oem = oem.try_with_oem_id(id)?;
    }
    if let Some(id) = &args.oem_table_id {
        oem = oem.try_with_oem_table_id(id)?;
    }
    if let Some(revision) = args.oem_revision {
        oem.set_oem_revision(revision);
    }
    Ok(oem)
}

fn ghes_descriptor(source: &GhesSource) -> Result<GhesV2, BuildError> {
    let read_ack = source
        .read_ack_address()
        .ok_or(BuildError::GhesAddress(source.source_id))?;
    let notification = HardwareErrorNotification::new(NotificationType::Sea, 0, 0);
    Ok(GhesV2::new(
        source.source_id,
        source.status_address,
        read_ack,
        notification,
    ))
}
