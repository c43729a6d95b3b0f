use crate::collect::collect_error_sources;
use crate::registry::ProducerRegistry;
use alloc::vec::Vec;
use hest_mm_abi::{MM_COMMUNICATE_HEADER_SIZE, MmCommunicateHeader, MmCommunication};
use log::{debug, error, info, trace};
use uefi::{Guid, Status};

/// Handles the payload of MM communication requests sent to one GUID.
pub trait MmiHandler {
    /// Processes `payload` in place.
    ///
    /// # Errors
    /// The status returned to the requester.
    fn handle(&self, payload: &mut [u8]) -> Result<(), Status>;
}

/// Answers `MM_HEST_GET_ERROR_SOURCE_INFO` requests from the producers in a registry.
pub struct HestErrorSourceMmi<'r, R: ?Sized> {
    registry: &'r R,
}

impl<'r, R: ProducerRegistry + ?Sized> HestErrorSourceMmi<'r, R> {
    #[must_use]
    pub const fn new(registry: &'r R) -> Self {
        Self { registry }
    }
}

impl<R: ProducerRegistry + ?Sized> MmiHandler for HestErrorSourceMmi<'_, R> {
    fn handle(&self, payload: &mut [u8]) -> Result<(), Status> {
        match collect_error_sources(self.registry, payload) {
            Ok(report) => {
                info!(
                    "Returned {} error source descriptor(s), {} bytes",
                    report.written.count, report.written.length
                );
                Ok(())
            }
            Err(err) => {
                debug!("Error source collection stopped: {err}");
                Err(err.into())
            }
        }
    }
}

/// Routes MM communication buffers to the handler registered for their GUID.
#[derive(Default)]
pub struct MmiDispatcher<'h> {
    handlers: Vec<(Guid, &'h dyn MmiHandler)>,
}

impl<'h> MmiDispatcher<'h> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers `handler` for requests tagged with `guid`.
    ///
    /// # Errors
    /// * `Status::ALREADY_STARTED` if `guid` already has a handler.
    /// * `Status::OUT_OF_RESOURCES` if the handler list cannot grow.
    pub fn register(&mut self, guid: Guid, handler: &'h dyn MmiHandler) -> Result<(), Status> {
        if self.handlers.iter().any(|(g, _)| *g == guid) {
            error!("An MMI handler for {guid} is already registered");
            return Err(Status::ALREADY_STARTED);
        }
        self.handlers
            .try_reserve(1)
            .map_err(|_| Status::OUT_OF_RESOURCES)?;
        self.handlers.push((guid, handler));
        debug!("Registered MMI handler for {guid}");
        Ok(())
    }

    /// Removes the handler registered for `guid`.
    ///
    /// # Errors
    /// `Status::NOT_FOUND` if no handler is registered for `guid`.
    pub fn unregister(&mut self, guid: Guid) -> Result<(), Status> {
        let index = self
            .handlers
            .iter()
            .position(|(g, _)| *g == guid)
            .ok_or(Status::NOT_FOUND)?;
        self.handlers.remove(index);
        Ok(())
    }

    fn handler(&self, guid: &Guid) -> Option<&'h dyn MmiHandler> {
        self.handlers
            .iter()
            .find_map(|(g, h)| (g == guid).then_some(*h))
    }
}

impl MmCommunication for MmiDispatcher<'_> {
    fn communicate(&self, comm_buffer: &mut [u8]) -> Result<(), Status> {
        let header =
            MmCommunicateHeader::read_from(comm_buffer).map_err(|_| Status::BAD_BUFFER_SIZE)?;
        let available = comm_buffer.len() - MM_COMMUNICATE_HEADER_SIZE;
        let message_length = usize::try_from(header.message_length)
            .ok()
            .filter(|&len| len <= available)
            .ok_or_else(|| {
                error!(
                    "MM communication for {} declares {} bytes, buffer holds {available}",
                    header.header_guid, header.message_length
                );
                Status::BAD_BUFFER_SIZE
            })?;

        let handler = self.handler(&header.header_guid).ok_or_else(|| {
            error!("No MMI handler for {}", header.header_guid);
            Status::NOT_FOUND
        })?;

        trace!(
            "Dispatching {message_length} byte payload to {}",
            header.header_guid
        );
        let end = MM_COMMUNICATE_HEADER_SIZE + message_length;
        handler.handle(&mut comm_buffer[MM_COMMUNICATE_HEADER_SIZE..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::StaticErrorSources;
    use crate::registry::ProducerTable;
    use core::cell::Cell;
    use hest_mm_abi::{ErrorSourceDescInfo, MM_HEST_GET_ERROR_SOURCE_INFO_GUID, comm_buffer_size};
    use uefi::guid;

    struct Echo(Cell<usize>);

    impl MmiHandler for Echo {
        fn handle(&self, payload: &mut [u8]) -> Result<(), Status> {
            self.0.set(payload.len());
            Ok(())
        }
    }

    fn request(guid: Guid, total: usize) -> Vec<u8> {
        let mut buf = vec![0u8; total];
        MmCommunicateHeader::for_buffer(guid, total)
            .unwrap()
            .write_to(&mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn unknown_guid_is_not_found() {
        let dispatcher = MmiDispatcher::new();
        let mut buf = request(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, 40);
        assert_eq!(dispatcher.communicate(&mut buf), Err(Status::NOT_FOUND));
    }

    #[test]
    fn payload_is_bounded_by_message_length() {
        let echo = Echo(Cell::new(0));
        let tag = guid!("0b8e62f1-9a55-4c1e-8d1e-3f0a7c2b6d94");
        let mut dispatcher = MmiDispatcher::new();
        dispatcher.register(tag, &echo).unwrap();
        assert_eq!(dispatcher.register(tag, &echo), Err(Status::ALREADY_STARTED));

        let mut buf = request(tag, 64);
        buf[16..24].copy_from_slice(&10u64.to_le_bytes());
        dispatcher.communicate(&mut buf).unwrap();
        assert_eq!(echo.0.get(), 10);

        buf[16..24].copy_from_slice(&41u64.to_le_bytes());
        assert_eq!(dispatcher.communicate(&mut buf), Err(Status::BAD_BUFFER_SIZE));
        assert_eq!(dispatcher.communicate(&mut buf[..20]), Err(Status::BAD_BUFFER_SIZE));

        dispatcher.unregister(tag).unwrap();
        assert_eq!(dispatcher.communicate(&mut request(tag, 24)), Err(Status::NOT_FOUND));
    }

    #[test]
    fn hest_handler_answers_probe_and_fill() {
        let producers = ProducerTable::new();
        let _ = producers.install(StaticErrorSources::new(vec![9; 12], 1));
        let handler = HestErrorSourceMmi::new(&producers);
        let mut dispatcher = MmiDispatcher::new();
        dispatcher
            .register(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, &handler)
            .unwrap();

        let mut probe = request(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, comm_buffer_size(0).unwrap());
        assert_eq!(dispatcher.communicate(&mut probe), Err(Status::BUFFER_TOO_SMALL));
        let totals = ErrorSourceDescInfo::read_from(&probe[MM_COMMUNICATE_HEADER_SIZE..]).unwrap();
        assert_eq!(totals.length, 12);

        let mut fill = request(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, comm_buffer_size(12).unwrap());
        dispatcher.communicate(&mut fill).unwrap();
        assert_eq!(&fill[40..], &[9; 12]);
    }

    #[test]
    fn hest_handler_rejects_tiny_payload() {
        let producers = ProducerTable::new();
        let handler = HestErrorSourceMmi::new(&producers);
        let mut payload = [0u8; 8];
        assert_eq!(handler.handle(&mut payload), Err(Status::INVALID_PARAMETER));
    }
}
