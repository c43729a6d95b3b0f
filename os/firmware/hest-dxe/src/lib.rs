//! # MM Error Sources for the HEST
//!
//! Runs outside MM and asks the MM error source collector for the descriptors
//! of all MM-owned error sources, then appends them to the HEST through
//! [`HestTableProtocol`].
//!
//! The exchange takes two MM communication calls:
//!
//! 1. A probe with room for the descriptor info header only. MM answers with
//!    the descriptor totals, normally failing the call with
//!    `BUFFER_TOO_SMALL`.
//! 2. A call with a buffer sized for those totals, which MM fills.
//!
//! Nothing is appended when MM reports no error sources.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

use alloc::vec::Vec;
use hest_mm_abi::{
    AbiError, ErrorSourceDescInfo, MM_COMMUNICATE_HEADER_SIZE, MM_HEST_GET_ERROR_SOURCE_INFO_GUID,
    MmCommunicateHeader, MmCommunication, comm_buffer_size,
};
use hest_table::{HestError, HestTableProtocol};
use log::{debug, error, info};
use uefi::Status;

/// Result of a successful [`append_mm_error_sources`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppendOutcome {
    /// MM reported no error sources; the HEST was not touched.
    NoErrorSources,
    /// `count` descriptors totalling `length` bytes were appended.
    Appended { count: usize, length: usize },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum DxeError {
    #[error("Out of memory for the MM communication buffer")]
    OutOfMemory,
    #[error("MM communication failed: {0:?}")]
    Communicate(Status),
    #[error("Malformed reply from MM: {0}")]
    Reply(#[from] AbiError),
    #[error("Failed to append MM error sources to the HEST: {0}")]
    Append(#[from] HestError),
}

impl From<DxeError> for Status {
    fn from(err: DxeError) -> Self {
        match err {
            DxeError::OutOfMemory => Self::OUT_OF_RESOURCES,
            DxeError::Communicate(status) => status,
            DxeError::Reply(_) => Self::PROTOCOL_ERROR,
            DxeError::Append(err) => err.into(),
        }
    }
}

/// Collects the error source descriptors held in MM and appends them to `table`.
///
/// # Errors
/// * [`DxeError::OutOfMemory`] if a communication buffer cannot be allocated.
/// * [`DxeError::Communicate`] if either MM call fails, apart from the
///   expected size replies to the probe.
/// * [`DxeError::Reply`] if MM announces more descriptor bytes than it returned.
/// * [`DxeError::Append`] if the HEST rejects the descriptors.
pub fn append_mm_error_sources<C, T>(channel: &C, table: &mut T) -> Result<AppendOutcome, DxeError>
where
    C: MmCommunication + ?Sized,
    T: HestTableProtocol + ?Sized,
{
    let totals = probe_error_source_info(channel)?;
    if totals.count == 0 || totals.length == 0 {
        info!("MM reports no error sources");
        return Ok(AppendOutcome::NoErrorSources);
    }

    let length = usize::try_from(totals.length).map_err(|_| AbiError::LengthOverflow)?;
    debug!("MM reports {} error source(s) in {length} bytes", totals.count);

    let mut buffer = comm_buffer(length)?;
    channel.communicate(&mut buffer).map_err(|status| {
        error!("Failed to collect error source descriptors from MM: {status:?}");
        DxeError::Communicate(status)
    })?;

    let payload = &buffer[MM_COMMUNICATE_HEADER_SIZE..];
    let reply = ErrorSourceDescInfo::read_from(payload)?;
    let descriptors = reply.descriptors(payload)?;
    if reply.count == 0 || descriptors.is_empty() {
        info!("MM returned no error source descriptors");
        return Ok(AppendOutcome::NoErrorSources);
    }

    let count = usize::try_from(reply.count).map_err(|_| AbiError::LengthOverflow)?;
    table.append_error_source_descriptors(descriptors, descriptors.len(), count)?;
    info!("Appended {count} MM error source(s), {} bytes", descriptors.len());

    Ok(AppendOutcome::Appended {
        count,
        length: descriptors.len(),
    })
}

/// Asks MM for the descriptor totals without room for the descriptors.
fn probe_error_source_info<C>(channel: &C) -> Result<ErrorSourceDescInfo, DxeError>
where
    C: MmCommunication + ?Sized,
{
    let mut buffer = comm_buffer(0)?;
    match channel.communicate(&mut buffer) {
        Ok(()) | Err(Status::BUFFER_TOO_SMALL | Status::BAD_BUFFER_SIZE) => {}
        Err(status) => {
            error!("Failed to query MM error source info: {status:?}");
            return Err(DxeError::Communicate(status));
        }
    }
    Ok(ErrorSourceDescInfo::read_from(&buffer[MM_COMMUNICATE_HEADER_SIZE..])?)
}

/// A zeroed request for the collector with room for `descriptor_length` bytes.
fn comm_buffer(descriptor_length: usize) -> Result<Vec<u8>, DxeError> {
    let size = comm_buffer_size(descriptor_length)?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| DxeError::OutOfMemory)?;
    buffer.resize(size, 0);
    MmCommunicateHeader::for_buffer(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, size)?
        .write_to(&mut buffer)?;
    Ok(buffer)
}
