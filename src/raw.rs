//! Long-form extraction dump (`RUC,Data / hora,Evento`)

use anyhow::{Context, Result};
use std::path::Path;

use crate::types::{IdentifierEvents, RawRecord};

pub fn write_raw_csv(path: &Path, histories: &[IdentifierEvents]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut written = 0;
    for record in histories.iter().flat_map(IdentifierEvents::to_raw_records) {
        writer.serialize(&record)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

pub fn read_raw_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize::<RawRecord>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Bad record {} in {}", i + 1, path.display())))
        .collect()
}
