use crate::producer::ErrorSourceProducer;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use log::debug;
use uefi::Status;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// No producer is installed. Not a failure for the collector.
    #[error("No error source producers are installed")]
    NotFound,
    /// The producer set could not be read.
    #[error("Failed to locate error source producers: {0:?}")]
    Unavailable(Status),
}

impl From<RegistryError> for Status {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::NOT_FOUND,
            RegistryError::Unavailable(status) => status,
        }
    }
}

/// Source of the producers currently installed in MM.
pub trait ProducerRegistry {
    /// A snapshot of all installed producers, in installation order.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if none is installed.
    fn locate_producers(&self) -> Result<Vec<Rc<dyn ErrorSourceProducer>>, RegistryError>;
}

impl<T: ProducerRegistry + ?Sized> ProducerRegistry for &T {
    fn locate_producers(&self) -> Result<Vec<Rc<dyn ErrorSourceProducer>>, RegistryError> {
        (**self).locate_producers()
    }
}

/// Identifies an installed producer for [`ProducerTable::uninstall`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProducerHandle(usize);

/// Producers installed through the error source descriptor protocol.
///
/// Drivers may install or uninstall producers at any time, including from
/// inside a producer callback; every lookup takes a fresh snapshot.
#[derive(Default)]
pub struct ProducerTable {
    next_handle: Cell<usize>,
    producers: RefCell<Vec<(ProducerHandle, Rc<dyn ErrorSourceProducer>)>>,
}

impl ProducerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn install<P: ErrorSourceProducer + 'static>(&self, producer: P) -> ProducerHandle {
        self.install_shared(Rc::new(producer))
    }

    #[must_use]
    pub fn install_shared(&self, producer: Rc<dyn ErrorSourceProducer>) -> ProducerHandle {
        let handle = ProducerHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.producers.borrow_mut().push((handle, producer));
        debug!("Installed error source producer {}", handle.0);
        handle
    }

    /// Removes a producer. Snapshots taken earlier keep it alive.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if `handle` is not installed.
    pub fn uninstall(
        &self,
        handle: ProducerHandle,
    ) -> Result<Rc<dyn ErrorSourceProducer>, RegistryError> {
        let mut producers = self.producers.borrow_mut();
        let index = producers
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(RegistryError::NotFound)?;
        debug!("Uninstalled error source producer {}", handle.0);
        Ok(producers.remove(index).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProducerRegistry for ProducerTable {
    fn locate_producers(&self) -> Result<Vec<Rc<dyn ErrorSourceProducer>>, RegistryError> {
        let producers = self.producers.borrow();
        if producers.is_empty() {
            return Err(RegistryError::NotFound);
        }

        let mut snapshot = Vec::new();
        snapshot
            .try_reserve_exact(producers.len())
            .map_err(|_| RegistryError::Unavailable(Status::OUT_OF_RESOURCES))?;
        snapshot.extend(producers.iter().map(|(_, p)| Rc::clone(p)));
        Ok(snapshot)
    }
}
