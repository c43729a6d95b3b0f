use clap::Parser;
use std::path::PathBuf;

/// Assembles a Hardware Error Source Table the way firmware does: descriptors
/// are collected from MM producers, appended to the table and installed.
#[derive(Parser, Debug)]
#[command(name = "hest-builder")]
#[command(about = "Assemble a HEST from error source descriptor blobs")]
pub struct Args {
    /// File the finished table is written to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Descriptor blob registered as one MM producer; COUNT defaults to 1
    #[arg(short, long, value_name = "FILE[@COUNT]", value_parser = parse_descriptor_file)]
    pub descriptors: Vec<DescriptorFile>,

    /// GHESv2 error source with SEA notification; its read-ack register follows the status address
    #[arg(long, value_name = "SOURCE_ID@STATUS_ADDR", value_parser = parse_ghes_source)]
    pub ghes: Vec<GhesSource>,

    /// OEM ID, at most 6 ASCII characters
    #[arg(long)]
    pub oem_id: Option<String>,

    /// OEM table ID, at most 8 ASCII characters
    #[arg(long)]
    pub oem_table_id: Option<String>,

    /// OEM revision
    #[arg(long, value_parser = parse_u32)]
    pub oem_revision: Option<u32>,

    /// Log pass-level detail
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorFile {
    pub path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhesSource {
    pub source_id: u16,
    pub status_address: u64,
}

impl GhesSource {
    /// Read-ack register, the qword after the error status address.
    #[must_use]
    pub const fn read_ack_address(&self) -> Option<u64> {
        self.status_address.checked_add(8)
    }
}

fn parse_descriptor_file(value: &str) -> Result<DescriptorFile, String> {
    match value.rsplit_once('@') {
        Some((path, count)) if !path.is_empty() => Ok(DescriptorFile {
            path: PathBuf::from(path),
            count: count
                .parse()
                .map_err(|e| format!("invalid descriptor count {count:?}: {e}"))?,
        }),
        Some(_) => Err(format!("missing file name in {value:?}")),
        None => Ok(DescriptorFile {
            path: PathBuf::from(value),
            count: 1,
        }),
    }
}

fn parse_ghes_source(value: &str) -> Result<GhesSource, String> {
    let (id, address) = value
        .split_once('@')
        .ok_or_else(|| format!("expected SOURCE_ID@STATUS_ADDR, got {value:?}"))?;
    let source_id = u16::try_from(parse_u64(id)?)
        .map_err(|_| format!("source ID {id} exceeds 16 bits"))?;
    Ok(GhesSource {
        source_id,
        status_address: parse_u64(address)?,
    })
}

fn parse_u32(value: &str) -> Result<u32, String> {
    u32::try_from(parse_u64(value)?).map_err(|_| format!("{value} exceeds 32 bits"))
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_u64(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid number {value:?}: {e}"))
}
