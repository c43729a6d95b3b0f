//! # Generic Hardware Error Source (version 2) Descriptors
//!
//! Encoders for the HEST error source type most firmware-first platforms
//! publish. A GHESv2 entry points the OS at an error status block (through a
//! Generic Address Structure), says how the OS is notified when the block is
//! filled, and names the register the OS writes to acknowledge it.
//!
//! The table builder never looks inside these bytes; they exist for error
//! source producers.

/// HEST error source structure type for GHESv2.
pub const GHES_V2_TYPE: u16 = 10;

/// Source ID used in [`GhesV2::related_source_id`] when there is no related source.
pub const NO_RELATED_SOURCE: u16 = 0xFFFF;

/// Notification mechanisms (ACPI 6.3, Table 18-394).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Polled = 0,
    ExternalInterrupt = 1,
    LocalInterrupt = 2,
    Sci = 3,
    Nmi = 4,
    Cmci = 5,
    Mce = 6,
    GpioSignal = 7,
    /// ARMv8 Synchronous External Abort.
    Sea = 8,
    /// ARMv8 SError Interrupt.
    Sei = 9,
    /// Global System Interrupt Vector.
    Gsiv = 10,
    SoftwareDelegatedException = 11,
}

/// Which notification fields the OS may reconfigure.
///
/// Layout (LSB→MSB):
/// - bit 0: notification type
/// - bit 1: poll interval
/// - bit 2: switch-to-polling threshold value
/// - bit 3: switch-to-polling threshold window
/// - bit 4: error threshold value
/// - bit 5: error threshold window
/// - bits 6..15: reserved
#[bitfield_struct::bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct ConfigurationWriteEnable {
    #[bits(1)]
    pub notification_type: bool,
    #[bits(1)]
    pub poll_interval: bool,
    #[bits(1)]
    pub switch_to_polling_threshold_value: bool,
    #[bits(1)]
    pub switch_to_polling_threshold_window: bool,
    #[bits(1)]
    pub error_threshold_value: bool,
    #[bits(1)]
    pub error_threshold_window: bool,
    #[bits(10)]
    __: u16,
}

/// Hardware Error Notification Structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareErrorNotification {
    pub kind: NotificationType,
    pub configuration_write_enable: ConfigurationWriteEnable,
    /// Polling interval in milliseconds, for [`NotificationType::Polled`].
    pub poll_interval: u32,
    /// Interrupt vector or event ID, depending on the notification type.
    pub vector: u32,
    pub switch_to_polling_threshold_value: u32,
    pub switch_to_polling_threshold_window: u32,
    pub error_threshold_value: u32,
    pub error_threshold_window: u32,
}

impl HardwareErrorNotification {
    pub const SIZE: usize = 28;

    /// A notification with all thresholds and write-enable bits cleared.
    #[must_use]
    pub const fn new(kind: NotificationType, poll_interval: u32, vector: u32) -> Self {
        Self {
            kind,
            configuration_write_enable: ConfigurationWriteEnable::new(),
            poll_interval,
            vector,
            switch_to_polling_threshold_value: 0,
            switch_to_polling_threshold_window: 0,
            error_threshold_value: 0,
            error_threshold_window: 0,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.kind as u8;
        buf[1] = Self::SIZE as u8;
        buf[2..4].copy_from_slice(&self.configuration_write_enable.into_bits().to_le_bytes());
        buf[4..8].copy_from_slice(&self.poll_interval.to_le_bytes());
        buf[8..12].copy_from_slice(&self.vector.to_le_bytes());
        buf[12..16].copy_from_slice(&self.switch_to_polling_threshold_value.to_le_bytes());
        buf[16..20].copy_from_slice(&self.switch_to_polling_threshold_window.to_le_bytes());
        buf[20..24].copy_from_slice(&self.error_threshold_value.to_le_bytes());
        buf[24..28].copy_from_slice(&self.error_threshold_window.to_le_bytes());
        buf
    }
}

/// Generic Address Structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericAddress {
    pub address_space_id: u8,
    pub register_bit_width: u8,
    pub register_bit_offset: u8,
    /// 1 = byte, 2 = word, 3 = dword, 4 = qword.
    pub access_size: u8,
    pub address: u64,
}

impl GenericAddress {
    pub const SIZE: usize = 12;

    /// A 64-bit register in system memory, accessed as a qword.
    #[must_use]
    pub const fn system_memory_qword(address: u64) -> Self {
        Self {
            address_space_id: 0,
            register_bit_width: 64,
            register_bit_offset: 0,
            access_size: 4,
            address,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.address_space_id;
        buf[1] = self.register_bit_width;
        buf[2] = self.register_bit_offset;
        buf[3] = self.access_size;
        buf[4..12].copy_from_slice(&self.address.to_le_bytes());
        buf
    }
}

/// Generic Hardware Error Source version 2 (ACPI 6.3, Table 18-393).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhesV2 {
    pub source_id: u16,
    pub related_source_id: u16,
    pub flags: u8,
    pub enabled: bool,
    pub number_of_records_to_preallocate: u32,
    pub max_sections_per_record: u32,
    pub max_raw_data_length: u32,
    /// Location of the pointer to the error status block.
    pub error_status_address: GenericAddress,
    pub notification: HardwareErrorNotification,
    pub error_status_block_length: u32,
    pub read_ack_register: GenericAddress,
    pub read_ack_preserve: u64,
    pub read_ack_write: u64,
}

impl GhesV2 {
    pub const SIZE: usize = 92;

    /// Default size of the error status block backing a descriptor.
    pub const DEFAULT_ERROR_STATUS_BLOCK_LENGTH: u32 = 4096;

    /// An enabled descriptor with a single preallocated record.
    #[must_use]
    pub const fn new(
        source_id: u16,
        error_status_address: u64,
        read_ack_register: u64,
        notification: HardwareErrorNotification,
    ) -> Self {
        Self {
            source_id,
            related_source_id: NO_RELATED_SOURCE,
            flags: 0,
            enabled: true,
            number_of_records_to_preallocate: 1,
            max_sections_per_record: 1,
            max_raw_data_length: Self::DEFAULT_ERROR_STATUS_BLOCK_LENGTH,
            error_status_address: GenericAddress::system_memory_qword(error_status_address),
            notification,
            error_status_block_length: Self::DEFAULT_ERROR_STATUS_BLOCK_LENGTH,
            read_ack_register: GenericAddress::system_memory_qword(read_ack_register),
            read_ack_preserve: 0,
            read_ack_write: 1,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&GHES_V2_TYPE.to_le_bytes());
        buf[2..4].copy_from_slice(&self.source_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.related_source_id.to_le_bytes());
        buf[6] = self.flags;
        buf[7] = u8::from(self.enabled);
        buf[8..12].copy_from_slice(&self.number_of_records_to_preallocate.to_le_bytes());
        buf[12..16].copy_from_slice(&self.max_sections_per_record.to_le_bytes());
        buf[16..20].copy_from_slice(&self.max_raw_data_length.to_le_bytes());
        buf[20..32].copy_from_slice(&self.error_status_address.to_bytes());
        buf[32..60].copy_from_slice(&self.notification.to_bytes());
        buf[60..64].copy_from_slice(&self.error_status_block_length.to_le_bytes());
        buf[64..76].copy_from_slice(&self.read_ack_register.to_bytes());
        buf[76..84].copy_from_slice(&self.read_ack_preserve.to_le_bytes());
        buf[84..92].copy_from_slice(&self.read_ack_write.to_le_bytes());
        buf
    }
}
