//! # MM Error Source Collection
//!
//! Error source descriptors that only privileged (MM) code knows about are
//! gathered here and copied into the communication buffer of a non-MM
//! requester, which then appends them to the HEST.
//!
//! ## Two-phase protocol
//!
//! 1. **Probe.** Every registered [`ErrorSourceProducer`] is asked for the
//!    size and count of its descriptors. The totals are written into the
//!    [`ErrorSourceDescInfo`](hest_mm_abi::ErrorSourceDescInfo) header of the
//!    payload. If the payload cannot hold the descriptors the request ends
//!    with `BUFFER_TOO_SMALL`; the requester reallocates and calls again.
//! 2. **Fill.** Each producer writes its descriptors at the current cursor
//!    and the cursor advances by what it reports.
//!
//! The producer set is re-read from the [`ProducerRegistry`] on every
//! request, so drivers loaded between two requests are picked up.
//!
//! ## Components
//!
//! * [`collect_error_sources`] implements both phases over a payload.
//! * [`HestErrorSourceMmi`] exposes it as an [`MmiHandler`].
//! * [`MmiDispatcher`] routes communication buffers to handlers by GUID and
//!   implements [`MmCommunication`](hest_mm_abi::MmCommunication).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod collect;
mod mmi;
mod producer;
mod registry;

pub use collect::{CollectError, CollectionReport, collect_error_sources};
pub use mmi::{HestErrorSourceMmi, MmiDispatcher, MmiHandler};
pub use producer::{DescriptorInfo, ErrorSourceProducer, ProducerReply, StaticErrorSources};
pub use registry::{ProducerHandle, ProducerRegistry, ProducerTable, RegistryError};
