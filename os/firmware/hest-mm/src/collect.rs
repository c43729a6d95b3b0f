use crate::producer::{DescriptorInfo, ErrorSourceProducer, ProducerReply};
use crate::registry::{ProducerRegistry, RegistryError};
use alloc::rc::Rc;
use alloc::vec::Vec;
use hest_mm_abi::{ErrorSourceDescInfo, HEST_ERROR_SOURCE_DESC_INFO_SIZE};
use log::{debug, trace, warn};
use uefi::Status;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CollectError {
    /// The payload cannot even hold the descriptor info header.
    #[error("Communication buffer too small for the descriptor info header")]
    InvalidCommBuffer,
    /// The totals were written; the descriptors need `required` bytes.
    #[error("Descriptors need {required} bytes, the buffer holds {available}")]
    BufferTooSmall { required: usize, available: usize },
    #[error("Failed to locate error source producers: {0:?}")]
    Registry(Status),
}

impl From<CollectError> for Status {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::InvalidCommBuffer => Self::INVALID_PARAMETER,
            CollectError::BufferTooSmall { .. } => Self::BUFFER_TOO_SMALL,
            CollectError::Registry(status) => status,
        }
    }
}

/// What a collection declared in the payload header and what was copied.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CollectionReport {
    /// Totals from the probe pass, as written to the payload.
    pub declared: DescriptorInfo,
    /// Totals of the descriptors actually copied in the fill pass.
    pub written: DescriptorInfo,
}

/// Collects the descriptors of all registered producers into `payload`.
///
/// `payload` starts with an [`ErrorSourceDescInfo`] header that receives the
/// probed totals, followed by room for the descriptors. The header is written
/// even when the descriptors do not fit, so the caller can size its next
/// request.
///
/// Producers failing the fill pass are skipped; the declared totals are not
/// corrected for them.
///
/// # Errors
/// * [`CollectError::InvalidCommBuffer`] if `payload` cannot hold the header.
/// * [`CollectError::BufferTooSmall`] if the descriptors do not fit.
/// * [`CollectError::Registry`] if the producers cannot be located.
pub fn collect_error_sources<R>(
    registry: &R,
    payload: &mut [u8],
) -> Result<CollectionReport, CollectError>
where
    R: ProducerRegistry + ?Sized,
{
    if payload.len() < HEST_ERROR_SOURCE_DESC_INFO_SIZE {
        return Err(CollectError::InvalidCommBuffer);
    }

    let producers = match registry.locate_producers() {
        Ok(producers) => producers,
        Err(RegistryError::NotFound) => {
            debug!("No error source producers installed");
            Vec::new()
        }
        Err(RegistryError::Unavailable(status)) => return Err(CollectError::Registry(status)),
    };

    let declared = probe(&producers);
    let header = ErrorSourceDescInfo {
        count: declared.count as u64,
        length: declared.length as u64,
    };
    header
        .write_to(payload)
        .map_err(|_| CollectError::InvalidCommBuffer)?;

    if declared.length == 0 {
        return Ok(CollectionReport {
            declared,
            written: DescriptorInfo::default(),
        });
    }

    let region = &mut payload[HEST_ERROR_SOURCE_DESC_INFO_SIZE..];
    if declared.length > region.len() {
        debug!(
            "Error source descriptors need {} bytes, buffer holds {}",
            declared.length,
            region.len()
        );
        return Err(CollectError::BufferTooSmall {
            required: declared.length,
            available: region.len(),
        });
    }

    let written = fill(&producers, region);
    if written.length < declared.length {
        warn!(
            "Copied {} of {} declared error source descriptor bytes",
            written.length, declared.length
        );
    }

    Ok(CollectionReport { declared, written })
}

/// Sums the sizes reported by producers queried without a destination.
fn probe(producers: &[Rc<dyn ErrorSourceProducer>]) -> DescriptorInfo {
    let mut total = DescriptorInfo::default();
    for (index, producer) in producers.iter().enumerate() {
        let info = match producer.error_source_descriptors(None) {
            Ok(ProducerReply::SizeOnly(info)) => info,
            Ok(ProducerReply::Written(_)) => {
                warn!("Producer {index} wrote descriptors without a destination; skipped");
                continue;
            }
            Err(status) => {
                debug!("Producer {index} failed the size query: {status:?}");
                continue;
            }
        };

        match (
            total.count.checked_add(info.count),
            total.length.checked_add(info.length),
        ) {
            (Some(count), Some(length)) => {
                trace!(
                    "Producer {index}: {} descriptor(s), {} bytes",
                    info.count, info.length
                );
                total = DescriptorInfo::new(count, length);
            }
            _ => warn!("Producer {index} overflows the descriptor totals; skipped"),
        }
    }
    total
}

/// Lets each producer write at the cursor and advances by what it reports.
fn fill(producers: &[Rc<dyn ErrorSourceProducer>], region: &mut [u8]) -> DescriptorInfo {
    let mut written = DescriptorInfo::default();
    for (index, producer) in producers.iter().enumerate() {
        let remaining = &mut region[written.length..];
        let capacity = remaining.len();
        match producer.error_source_descriptors(Some(remaining)) {
            Ok(ProducerReply::Written(info)) if info.length <= capacity => {
                trace!("Producer {index} wrote {} bytes", info.length);
                written.length += info.length;
                written.count = written.count.saturating_add(info.count);
            }
            Ok(ProducerReply::Written(info)) => {
                warn!(
                    "Producer {index} reports {} bytes for {capacity} available; skipped",
                    info.length
                );
            }
            Ok(ProducerReply::SizeOnly(info)) => {
                if !info.is_empty() {
                    warn!("Producer {index} did not write its descriptors");
                }
            }
            Err(status) => warn!("Producer {index} failed to write descriptors: {status:?}"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::StaticErrorSources;
    use crate::registry::ProducerTable;
    use core::cell::Cell;

    /// Answers the size query like a well-behaved producer but fails to write.
    struct FailsOnFill(DescriptorInfo);

    impl ErrorSourceProducer for FailsOnFill {
        fn error_source_descriptors(
            &self,
            destination: Option<&mut [u8]>,
        ) -> Result<ProducerReply, Status> {
            match destination {
                None => Ok(ProducerReply::SizeOnly(self.0)),
                Some(_) => Err(Status::DEVICE_ERROR),
            }
        }
    }

    /// Counts how often it is queried.
    struct Counting(Rc<Cell<usize>>);

    impl ErrorSourceProducer for Counting {
        fn error_source_descriptors(&self, _: Option<&mut [u8]>) -> Result<ProducerReply, Status> {
            self.0.set(self.0.get() + 1);
            Ok(ProducerReply::SizeOnly(DescriptorInfo::default()))
        }
    }

    fn three_producers() -> ProducerTable {
        let table = ProducerTable::new();
        let _ = table.install(StaticErrorSources::new(vec![0xA1; 16], 1));
        let _ = table.install(StaticErrorSources::new(vec![0xB2; 32], 2));
        let _ = table.install(StaticErrorSources::new(Vec::new(), 0));
        table
    }

    fn header(payload: &[u8]) -> ErrorSourceDescInfo {
        ErrorSourceDescInfo::read_from(payload).unwrap()
    }

    #[test]
    fn payload_without_room_for_header() {
        let table = three_producers();
        let mut payload = [0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE - 1];
        assert_eq!(
            collect_error_sources(&table, &mut payload),
            Err(CollectError::InvalidCommBuffer)
        );
    }

    #[test]
    fn probe_reports_totals_of_three_producers() {
        let table = three_producers();
        let mut payload = [0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE];
        assert_eq!(
            collect_error_sources(&table, &mut payload),
            Err(CollectError::BufferTooSmall {
                required: 48,
                available: 0
            })
        );
        assert_eq!(
            header(&payload),
            ErrorSourceDescInfo {
                count: 3,
                length: 48
            }
        );
    }

    #[test]
    fn fill_concatenates_in_producer_order() {
        let table = three_producers();
        let mut payload = vec![0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE + 48];
        let report = collect_error_sources(&table, &mut payload).unwrap();

        assert_eq!(report.declared, DescriptorInfo::new(3, 48));
        assert_eq!(report.written, DescriptorInfo::new(3, 48));
        assert!(payload[16..32].iter().all(|&b| b == 0xA1));
        assert!(payload[32..64].iter().all(|&b| b == 0xB2));
    }

    #[test]
    fn no_producers_is_success_with_zero_totals() {
        let table = ProducerTable::new();
        let mut payload = [0xFFu8; HEST_ERROR_SOURCE_DESC_INFO_SIZE];
        let report = collect_error_sources(&table, &mut payload).unwrap();
        assert_eq!(report, CollectionReport::default());
        assert_eq!(header(&payload), ErrorSourceDescInfo::default());
    }

    #[test]
    fn uncounted_descriptor_bytes_are_still_collected() {
        let table = ProducerTable::new();
        let _ = table.install(StaticErrorSources::new(vec![0xAB; 16], 0));

        let mut short = [0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE];
        assert_eq!(
            collect_error_sources(&table, &mut short),
            Err(CollectError::BufferTooSmall {
                required: 16,
                available: 0
            })
        );

        let mut payload = vec![0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE + 16];
        let report = collect_error_sources(&table, &mut payload).unwrap();
        assert_eq!(report.declared, DescriptorInfo::new(0, 16));
        assert_eq!(report.written, DescriptorInfo::new(0, 16));
        assert!(payload[16..32].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn capacity_boundary() {
        let table = ProducerTable::new();
        let _ = table.install(StaticErrorSources::new(vec![1; 96], 3));

        let mut exact = vec![0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE + 96];
        assert!(collect_error_sources(&table, &mut exact).is_ok());

        let mut short = vec![0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE + 95];
        assert_eq!(
            collect_error_sources(&table, &mut short),
            Err(CollectError::BufferTooSmall {
                required: 96,
                available: 95
            })
        );
        assert_eq!(
            header(&short),
            ErrorSourceDescInfo {
                count: 3,
                length: 96
            }
        );
    }

    #[test]
    fn failed_fill_keeps_declared_totals() {
        let table = ProducerTable::new();
        let _ = table.install(FailsOnFill(DescriptorInfo::new(1, 8)));
        let _ = table.install(StaticErrorSources::new(vec![0xC3; 8], 1));

        let mut payload = vec![0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE + 16];
        let report = collect_error_sources(&table, &mut payload).unwrap();

        assert_eq!(report.declared, DescriptorInfo::new(2, 16));
        assert_eq!(report.written, DescriptorInfo::new(1, 8));
        assert_eq!(header(&payload).length, 16);
        // The next producer takes the failed producer's place at the cursor.
        assert!(payload[16..24].iter().all(|&b| b == 0xC3));
    }

    #[test]
    fn producers_are_looked_up_on_every_request() {
        let table = ProducerTable::new();
        let calls = Rc::new(Cell::new(0));
        let _ = table.install(Counting(Rc::clone(&calls)));

        let mut payload = [0u8; HEST_ERROR_SOURCE_DESC_INFO_SIZE];
        collect_error_sources(&table, &mut payload).unwrap();
        assert_eq!(calls.get(), 1);

        let _ = table.install(StaticErrorSources::new(vec![5; 4], 1));
        assert!(collect_error_sources(&table, &mut payload).is_err());
        assert_eq!(calls.get(), 2);
        assert_eq!(header(&payload).count, 1);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            Status::from(CollectError::InvalidCommBuffer),
            Status::INVALID_PARAMETER
        );
        assert_eq!(
            Status::from(CollectError::BufferTooSmall {
                required: 1,
                available: 0
            }),
            Status::BUFFER_TOO_SMALL
        );
    }
}
