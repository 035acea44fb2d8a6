use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};

use stagehand_engine::assets::{BlobHeader, BlobWriter};
use stagehand_engine::logging::{init_logging, LoggingConfig};

mod manifest;
mod process;

use manifest::Manifest;

#[derive(Parser, Debug)]
#[command(name = "stagehand-pack", version)]
struct Cli {
    /// Log filter (env_logger syntax).
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack every asset listed in a manifest into one blob.
    Build {
        /// Manifest listing `<kind> <name> <path> [options]` lines.
        manifest: PathBuf,
        /// Output blob path.
        out: PathBuf,
        /// Fail instead of skipping entries whose source cannot be processed.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Print the header table of a blob.
    List {
        blob: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        console_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    match cli.cmd {
        Command::Build { manifest, out, strict } => cmd_build(&manifest, &out, strict),
        Command::List { blob } => cmd_list(&blob),
    }
}

fn cmd_build(manifest_path: &Path, out: &Path, strict: bool) -> anyhow::Result<()> {
    let text = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read manifest {}", manifest_path.display()))?;
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));
    let manifest = Manifest::parse(&text, base_dir);

    let mut writer = BlobWriter::new();
    let mut failed = 0usize;
    for entry in &manifest.entries {
        let packed = process::payload(entry)
            .and_then(|bytes| Ok(writer.add(entry.name.clone(), entry.kind, bytes)?));
        if let Err(e) = packed {
            if strict {
                return Err(e.context(format!("manifest line {}", entry.line)));
            }
            log::warn!("manifest line {}: `{}` skipped: {e:#}", entry.line, entry.name);
            failed += 1;
        }
    }

    if writer.is_empty() {
        bail!("nothing to pack from {}", manifest_path.display());
    }
    writer
        .write_file(out)
        .with_context(|| format!("failed to write {}", out.display()))?;

    log::info!(
        "packed {} assets into {} ({} lines skipped, {} options ignored, {} entries failed)",
        writer.len(),
        out.display(),
        manifest.skipped_lines,
        manifest.skipped_options,
        failed
    );
    Ok(())
}

fn cmd_list(path: &Path) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let len = file.metadata()?.len();
    let header = BlobHeader::read(BufReader::new(file), len)
        .with_context(|| format!("{} is not a valid blob", path.display()))?;

    println!("{:<32} {:<8} {:>10} {:>10}", "name", "kind", "offset", "length");
    for r in &header.records {
        println!("{:<32} {:<8} {:>10} {:>10}", r.name, r.kind.as_str(), r.offset, r.length);
    }
    println!("{} records, payload starts at byte {}", header.records.len(), header.data_start);
    Ok(())
}
