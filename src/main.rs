//! Batch driver: map a folder of MARC files into inventory instances.
//!
//! Usage:
//!   bibmap <SOURCE_FOLDER> <RESULT_FOLDER> \
//!     --reference-data reference_data.json \
//!     --ils-flavour sierra \
//!     [--suppress] [--marcxml] [--write-srs]
//!
//! Writes to RESULT_FOLDER:
//!   folio_instances.json               one instance per line
//!   instance_id_map.json               legacy id -> {"id": instance id}
//!   instance_transformation_report.md  the migration report
//!   srs.json                           with --write-srs, one MARC-in-JSON record per line

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bibmap::{
    marcxml, sink, BibsMapper, IlsFlavour, MapperConfig, MarcReader, MigrationRun, RecoveryMode,
    ReferenceData,
};
use clap::Parser;
use tracing::info;

/// Map MARC bibliographic records to inventory instances
#[derive(Parser, Debug)]
#[command(name = "bibmap", version)]
struct Args {
    /// Folder holding the MARC files to map
    source_folder: PathBuf,

    /// Folder the output files are written to
    result_folder: PathBuf,

    /// Reference data snapshot (JSON)
    #[arg(long)]
    reference_data: PathBuf,

    /// Source system: sierra, iii, 907y, 035, aleph or voyager
    #[arg(long, value_parser = parse_flavour)]
    ils_flavour: IlsFlavour,

    /// Suppress every instance from discovery and staff views
    #[arg(long)]
    suppress: bool,

    /// Source files are MARCXML instead of ISO 2709
    #[arg(long)]
    marcxml: bool,

    /// Also write the mapped source records as MARC-in-JSON
    #[arg(long)]
    write_srs: bool,
}

fn parse_flavour(value: &str) -> std::result::Result<IlsFlavour, String> {
    value.parse().map_err(|e: bibmap::MappingError| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let reference_data = ReferenceData::from_path(&args.reference_data).with_context(|| {
        format!("Loading reference data from {}", args.reference_data.display())
    })?;
    let config = MapperConfig::new(args.ils_flavour).with_suppress(args.suppress);
    let mapper = BibsMapper::new(config, reference_data).context("Reference data is unusable")?;

    let files = source_files(&args.source_folder)?;
    info!(count = files.len(), folder = %args.source_folder.display(), "Files to process");

    let mut run = MigrationRun::new(mapper);
    for path in &files {
        info!(file = %path.display(), "Processing");
        let source = path.display().to_string();
        if args.marcxml {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            run.process_batch(&source, marcxml::marcxml_to_records(&xml));
        } else {
            let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
            let reader = MarcReader::new(file).with_recovery_mode(RecoveryMode::Lenient);
            run.process_batch(&source, reader);
        }
    }

    let (mapper, mapped) = run.finish();
    sink::write_run_outputs(&args.result_folder, &mapper, &mapped, args.write_srs)
        .with_context(|| format!("Writing results to {}", args.result_folder.display()))?;

    info!(
        mapped = mapped.len(),
        folder = %args.result_folder.display(),
        "Done"
    );
    Ok(())
}

/// Regular files of a folder, sorted by name.
fn source_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("Listing {}", folder.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
