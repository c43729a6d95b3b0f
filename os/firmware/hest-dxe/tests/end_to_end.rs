use firmware_acpi::{AcpiOemInfo, HestHeader, checksum};
use hest_dxe::{AppendOutcome, append_mm_error_sources};
use hest_mm::{HestErrorSourceMmi, MmiDispatcher, ProducerTable, StaticErrorSources};
use hest_mm_abi::MM_HEST_GET_ERROR_SOURCE_INFO_GUID;
use hest_table::{AcpiTableKey, AcpiTablePublisher, HestDxe, HestTableProtocol};
use uefi::Status;

#[derive(Default)]
struct AcpiTables(Vec<Vec<u8>>);

impl AcpiTablePublisher for AcpiTables {
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<AcpiTableKey, Status> {
        self.0.push(table.to_vec());
        Ok(AcpiTableKey(self.0.len()))
    }
}

#[test]
fn mm_error_sources_end_up_in_the_installed_hest() {
    let producers = ProducerTable::new();
    let _ = producers.install(StaticErrorSources::new(vec![0x11; 16], 1));
    let _ = producers.install(StaticErrorSources::new(vec![0x22; 32], 2));
    let _ = producers.install(StaticErrorSources::new(Vec::new(), 0));

    let handler = HestErrorSourceMmi::new(&producers);
    let mut mm = MmiDispatcher::new();
    mm.register(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, &handler).unwrap();

    let mut hest = HestDxe::new(AcpiOemInfo::default(), AcpiTables::default());
    // A non-MM driver contributes first.
    hest.append_error_source_descriptors(&[0x33; 8], 8, 1).unwrap();

    let outcome = append_mm_error_sources(&mm, &mut hest).unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { count: 3, length: 48 });

    hest.install_hest_table().unwrap();
    let tables = hest.into_publisher().0;
    let table = &tables[0];

    let header = HestHeader::read_from(table).unwrap();
    assert_eq!(header.error_source_count, 4);
    assert_eq!(header.header.length, 40 + 8 + 48);
    assert!(checksum::is_valid(table));
    assert!(table[40..48].iter().all(|&b| b == 0x33));
    assert!(table[48..64].iter().all(|&b| b == 0x11));
    assert!(table[64..96].iter().all(|&b| b == 0x22));
}

#[test]
fn no_mm_producers_leaves_hest_untouched() {
    let producers = ProducerTable::new();
    let handler = HestErrorSourceMmi::new(&producers);
    let mut mm = MmiDispatcher::new();
    mm.register(MM_HEST_GET_ERROR_SOURCE_INFO_GUID, &handler).unwrap();

    let mut hest = HestDxe::new(AcpiOemInfo::default(), AcpiTables::default());
    assert_eq!(
        append_mm_error_sources(&mm, &mut hest),
        Ok(AppendOutcome::NoErrorSources)
    );
    assert!(!hest.table().is_built());

    hest.install_hest_table().unwrap();
    assert!(hest.publisher().0.is_empty());
}

#[test]
fn missing_collector_is_reported() {
    let mm = MmiDispatcher::new();
    let mut hest = HestDxe::new(AcpiOemInfo::default(), AcpiTables::default());
    let err = append_mm_error_sources(&mm, &mut hest).unwrap_err();
    assert_eq!(Status::from(err), Status::NOT_FOUND);
}
