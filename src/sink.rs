//! Output files of a mapping run.
//!
//! - `folio_instances.json`: one instance per line
//! - `instance_id_map.json`: legacy id to `{"id": instance id}`
//! - `instance_transformation_report.md`: the migration report
//! - `srs.json` (optional): one MARC-in-JSON source record per line

use crate::conditions::ConditionEvaluator;
use crate::mapper::{BibsMapper, MappedRecord};
use crate::marcjson::record_to_marcjson;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Instances, one JSON object per line.
pub const INSTANCES_FILE: &str = "folio_instances.json";
/// Identifier map.
pub const ID_MAP_FILE: &str = "instance_id_map.json";
/// Migration report as Markdown.
pub const REPORT_FILE: &str = "instance_transformation_report.md";
/// Source records as MARC-in-JSON, one per line.
pub const SRS_FILE: &str = "srs.json";

/// Write every output file of a run into `folder`, creating it if needed.
///
/// # Errors
///
/// Returns any I/O or serialization error.
pub fn write_run_outputs<E: ConditionEvaluator>(
    folder: &Path,
    mapper: &BibsMapper<E>,
    mapped: &[MappedRecord],
    write_srs: bool,
) -> io::Result<()> {
    fs::create_dir_all(folder)?;
    write_instances(&folder.join(INSTANCES_FILE), mapped)?;
    if write_srs {
        write_source_records(&folder.join(SRS_FILE), mapped)?;
    }
    fs::write(
        folder.join(ID_MAP_FILE),
        serde_json::to_string_pretty(&mapper.id_map().to_json())?,
    )?;
    fs::write(folder.join(REPORT_FILE), mapper.report().to_markdown())?;
    Ok(())
}

/// Write instances as JSON lines.
///
/// # Errors
///
/// Returns any I/O or serialization error.
pub fn write_instances(path: &Path, mapped: &[MappedRecord]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for record in mapped {
        serde_json::to_writer(&mut out, &record.instance)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Write the mapped source records as MARC-in-JSON lines.
///
/// # Errors
///
/// Returns any I/O or serialization error.
pub fn write_source_records(path: &Path, mapped: &[MappedRecord]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for record in mapped {
        serde_json::to_writer(&mut out, &record_to_marcjson(&record.source))?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
