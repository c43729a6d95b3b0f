use alloc::vec::Vec;
use firmware_acpi::ghes::GhesV2;
use uefi::Status;

/// Count and byte size of a block of error source descriptors.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DescriptorInfo {
    pub count: usize,
    pub length: usize,
}

impl DescriptorInfo {
    #[must_use]
    pub const fn new(count: usize, length: usize) -> Self {
        Self { count, length }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0 || self.length == 0
    }
}

/// Outcome of a successful [`ErrorSourceProducer`] query.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProducerReply {
    /// No usable destination was given; only the sizes are reported.
    SizeOnly(DescriptorInfo),
    /// The descriptors were copied to the start of the destination.
    Written(DescriptorInfo),
}

/// A driver that owns error sources and can describe them as HEST descriptors.
pub trait ErrorSourceProducer {
    /// Reports this producer's descriptors and, given a large enough
    /// `destination`, copies them to its start.
    ///
    /// # Errors
    /// Any status the producer fails with; the collector skips the producer.
    fn error_source_descriptors(
        &self,
        destination: Option<&mut [u8]>,
    ) -> Result<ProducerReply, Status>;
}

/// A producer whose descriptors are fixed when it is created.
#[derive(Debug, Clone, Default)]
pub struct StaticErrorSources {
    descriptors: Vec<u8>,
    count: usize,
}

impl StaticErrorSources {
    /// A producer for `count` descriptors encoded back to back in `descriptors`.
    #[must_use]
    pub const fn new(descriptors: Vec<u8>, count: usize) -> Self {
        Self { descriptors, count }
    }

    /// A producer for a set of GHESv2 error sources.
    ///
    /// # Errors
    /// `Status::OUT_OF_RESOURCES` if the descriptors cannot be allocated.
    pub fn ghes_v2(sources: &[GhesV2]) -> Result<Self, Status> {
        let length = sources
            .len()
            .checked_mul(GhesV2::SIZE)
            .ok_or(Status::OUT_OF_RESOURCES)?;
        let mut descriptors = Vec::new();
        descriptors
            .try_reserve_exact(length)
            .map_err(|_| Status::OUT_OF_RESOURCES)?;
        for source in sources {
            descriptors.extend_from_slice(&source.to_bytes());
        }
        Ok(Self::new(descriptors, sources.len()))
    }

    #[must_use]
    pub const fn info(&self) -> DescriptorInfo {
        DescriptorInfo::new(self.count, self.descriptors.len())
    }
}

impl ErrorSourceProducer for StaticErrorSources {
    fn error_source_descriptors(
        &self,
        destination: Option<&mut [u8]>,
    ) -> Result<ProducerReply, Status> {
        let info = self.info();
        match destination {
            Some(dest) if dest.len() >= info.length => {
                dest[..info.length].copy_from_slice(&self.descriptors);
                Ok(ProducerReply::Written(info))
            }
            _ => Ok(ProducerReply::SizeOnly(info)),
        }
    }
}
