//! # HEST MM Communication ABI
//!
//! Layout of the communication buffer exchanged between the non-MM HEST
//! client and the MM error source collector:
//!
//! ```text
//! ┌──────────────────────────────┐ 0
//! │ MmCommunicateHeader          │   header_guid (16), message_length (8)
//! ├──────────────────────────────┤ 24
//! │ ErrorSourceDescInfo          │   count (8), length (8)
//! ├──────────────────────────────┤ 40
//! │ error source descriptors     │   `length` bytes, filled by MM
//! └──────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The collector only sees the payload that
//! follows the communicate header; `message_length` tells it how large that
//! payload is.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

use uefi::{Guid, Status, guid};

/// MMI service tag of the HEST error source collector.
pub const MM_HEST_GET_ERROR_SOURCE_INFO_GUID: Guid = guid!("7d602951-678e-4cc4-98d9-e37604f6930d");

/// Protocol implemented by MM drivers that contribute error source descriptors.
pub const MM_HEST_ERROR_SOURCE_DESC_PROTOCOL_GUID: Guid =
    guid!("560bf236-a4a8-4d69-bcf6-c29724109d91");

/// Protocol through which DXE drivers append descriptors to the HEST and install it.
pub const HEST_TABLE_PROTOCOL_GUID: Guid = guid!("705bdcd9-8c47-457e-ad0d-f786f34a0d63");

/// Size of [`MmCommunicateHeader`] on the wire.
pub const MM_COMMUNICATE_HEADER_SIZE: usize = 24;

/// Size of [`ErrorSourceDescInfo`] on the wire, excluding the descriptors.
pub const HEST_ERROR_SOURCE_DESC_INFO_SIZE: usize = 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AbiError {
    #[error("Buffer too short: needed {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("Buffer size does not fit the ABI's integer width")]
    LengthOverflow,
}

/// Synchronous request/response channel into MM.
///
/// The callee reads and writes `comm_buffer` in place; the first
/// [`MM_COMMUNICATE_HEADER_SIZE`] bytes carry the [`MmCommunicateHeader`]
/// that selects the handler and bounds the payload. The call does not return
/// before MM has finished with the buffer.
pub trait MmCommunication {
    /// Sends `comm_buffer` to the handler named in its header.
    ///
    /// # Errors
    /// The status reported by the channel or by the handler.
    /// `Status::BUFFER_TOO_SMALL` is the regular reply to a size probe.
    fn communicate(&self, comm_buffer: &mut [u8]) -> Result<(), Status>;
}

impl<T: MmCommunication + ?Sized> MmCommunication for &T {
    fn communicate(&self, comm_buffer: &mut [u8]) -> Result<(), Status> {
        (**self).communicate(comm_buffer)
    }
}

/// Header preceding every MM communication payload.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MmCommunicateHeader {
    /// Handler the payload is meant for.
    pub header_guid: Guid,
    /// Size of the payload following the header, in bytes.
    pub message_length: u64,
}

impl MmCommunicateHeader {
    /// Header for a communication buffer of `buffer_len` bytes in total.
    ///
    /// # Errors
    /// [`AbiError::TooShort`] if the buffer cannot hold the header itself.
    pub fn for_buffer(header_guid: Guid, buffer_len: usize) -> Result<Self, AbiError> {
        let payload = buffer_len
            .checked_sub(MM_COMMUNICATE_HEADER_SIZE)
            .ok_or(AbiError::TooShort {
                needed: MM_COMMUNICATE_HEADER_SIZE,
                actual: buffer_len,
            })?;
        Ok(Self {
            header_guid,
            message_length: u64::try_from(payload).map_err(|_| AbiError::LengthOverflow)?,
        })
    }

    /// # Errors
    /// [`AbiError::TooShort`] if `buf` cannot hold the header.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), AbiError> {
        ensure_len(buf, MM_COMMUNICATE_HEADER_SIZE)?;
        buf[0..16].copy_from_slice(&self.header_guid.to_bytes());
        buf[16..24].copy_from_slice(&self.message_length.to_le_bytes());
        Ok(())
    }

    /// # Errors
    /// [`AbiError::TooShort`] if `buf` cannot hold the header.
    pub fn read_from(buf: &[u8]) -> Result<Self, AbiError> {
        ensure_len(buf, MM_COMMUNICATE_HEADER_SIZE)?;
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&buf[0..16]);
        Ok(Self {
            header_guid: Guid::from_bytes(guid),
            message_length: read_u64_le(buf, 16)?,
        })
    }
}

/// Count and total size of the error source descriptors in a payload.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ErrorSourceDescInfo {
    /// Total count of error source descriptors.
    pub count: u64,
    /// Total size of all error source descriptors, in bytes.
    pub length: u64,
}

impl ErrorSourceDescInfo {
    /// # Errors
    /// [`AbiError::TooShort`] if `payload` cannot hold the info header.
    pub fn write_to(&self, payload: &mut [u8]) -> Result<(), AbiError> {
        ensure_len(payload, HEST_ERROR_SOURCE_DESC_INFO_SIZE)?;
        payload[0..8].copy_from_slice(&self.count.to_le_bytes());
        payload[8..16].copy_from_slice(&self.length.to_le_bytes());
        Ok(())
    }

    /// # Errors
    /// [`AbiError::TooShort`] if `payload` cannot hold the info header.
    pub fn read_from(payload: &[u8]) -> Result<Self, AbiError> {
        Ok(Self {
            count: read_u64_le(payload, 0)?,
            length: read_u64_le(payload, 8)?,
        })
    }

    /// The descriptor bytes this header announces, taken from `payload`.
    ///
    /// # Errors
    /// * [`AbiError::LengthOverflow`] if `length` does not fit the address space.
    /// * [`AbiError::TooShort`] if `payload` holds fewer descriptor bytes than announced.
    pub fn descriptors<'a>(&self, payload: &'a [u8]) -> Result<&'a [u8], AbiError> {
        let length = usize::try_from(self.length).map_err(|_| AbiError::LengthOverflow)?;
        let end = HEST_ERROR_SOURCE_DESC_INFO_SIZE
            .checked_add(length)
            .ok_or(AbiError::LengthOverflow)?;
        payload
            .get(HEST_ERROR_SOURCE_DESC_INFO_SIZE..end)
            .ok_or(AbiError::TooShort {
                needed: end,
                actual: payload.len(),
            })
    }
}

/// Size of a communication buffer able to carry `descriptor_length` bytes of descriptors.
///
/// # Errors
/// [`AbiError::LengthOverflow`] if the sum overflows.
pub fn comm_buffer_size(descriptor_length: usize) -> Result<usize, AbiError> {
    (MM_COMMUNICATE_HEADER_SIZE + HEST_ERROR_SOURCE_DESC_INFO_SIZE)
        .checked_add(descriptor_length)
        .ok_or(AbiError::LengthOverflow)
}

#[inline]
const fn ensure_len(buf: &[u8], needed: usize) -> Result<(), AbiError> {
    if buf.len() < needed {
        return Err(AbiError::TooShort {
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

#[inline]
fn read_u64_le(buf: &[u8], off: usize) -> Result<u64, AbiError> {
    let end = off.checked_add(8).ok_or(AbiError::LengthOverflow)?;
    let s = buf.get(off..end).ok_or(AbiError::TooShort {
        needed: end,
        actual: buf.len(),
    })?;
    Ok(u64::from_le_bytes([
        s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
    ]))
}
