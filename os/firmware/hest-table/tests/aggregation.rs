use firmware_acpi::{AcpiOemInfo, HestHeader, checksum};
use hest_table::{
    AcpiTableKey, AcpiTablePublisher, HestDxe, HestError, HestTable, HestTableProtocol,
};
use proptest::prelude::*;
use uefi::Status;

#[derive(Default)]
struct Installed(Vec<Vec<u8>>);

impl AcpiTablePublisher for Installed {
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<AcpiTableKey, Status> {
        self.0.push(table.to_vec());
        Ok(AcpiTableKey(0x4845))
    }
}

fn arb_block() -> impl Strategy<Value = (Vec<u8>, usize)> {
    (prop::collection::vec(any::<u8>(), 1..128), 0usize..8)
}

proptest! {
    #[test]
    fn header_tracks_appended_blocks(blocks in prop::collection::vec(arb_block(), 1..12)) {
        let mut hest = HestTable::default();
        let mut expected = Vec::new();
        let mut count = 0u32;

        for (bytes, n) in &blocks {
            hest.append(bytes, bytes.len(), *n).unwrap();
            expected.extend_from_slice(bytes);
            count += u32::try_from(*n).unwrap();
        }

        let table = hest.as_bytes();
        let header = HestHeader::read_from(table).unwrap();
        prop_assert_eq!(header.header.length as usize, table.len());
        prop_assert_eq!(table.len(), HestHeader::SIZE + expected.len());
        prop_assert_eq!(header.error_source_count, count);
        prop_assert_eq!(&table[HestHeader::SIZE..], expected.as_slice());
    }

    #[test]
    fn installed_table_always_sums_to_zero(blocks in prop::collection::vec(arb_block(), 1..6)) {
        let mut hest = HestDxe::new(AcpiOemInfo::default(), Installed::default());
        for (bytes, n) in &blocks {
            hest.append_error_source_descriptors(bytes, bytes.len(), *n).unwrap();
        }
        hest.install_hest_table().unwrap();

        let published = &hest.publisher().0;
        prop_assert_eq!(published.len(), 1);
        prop_assert!(checksum::is_valid(&published[0]));
    }

    #[test]
    fn rejected_appends_change_nothing(
        (bytes, n) in arb_block(),
        extra in 1usize..64,
    ) {
        let mut hest = HestTable::default();
        hest.append(&bytes, bytes.len(), n).unwrap();
        let before = hest.as_bytes().to_vec();

        prop_assert_eq!(
            hest.append(&bytes, bytes.len() + extra, 1),
            Err(HestError::InvalidArgument)
        );
        prop_assert_eq!(hest.as_bytes(), before.as_slice());
    }
}

#[test]
fn install_through_protocol_without_descriptors() {
    let mut hest = HestDxe::new(AcpiOemInfo::default(), Installed::default());
    hest.install_hest_table().unwrap();
    assert!(hest.publisher().0.is_empty());
    assert!(!hest.table().is_installed());
}

#[test]
fn drivers_contribute_through_a_shared_reference() {
    fn contribute(mut hest: impl HestTableProtocol, id: u8) {
        hest.append_error_source_descriptors(&[id; 12], 12, 1).unwrap();
    }

    let mut hest = HestDxe::new(AcpiOemInfo::default(), Installed::default());
    contribute(&mut hest, 1);
    contribute(&mut hest, 2);
    hest.install_hest_table().unwrap();

    let installed = hest.into_publisher().0;
    let table = &installed[0];
    assert_eq!(table.len(), 64);
    assert_eq!(&table[40..52], &[1; 12]);
    assert_eq!(&table[52..64], &[2; 12]);
    assert_eq!(HestHeader::read_from(table).unwrap().error_source_count, 2);
}
