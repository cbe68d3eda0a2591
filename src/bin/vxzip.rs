//! Command-line front-end: extract an XZIP archive to a directory, build
//! one from a directory tree, or list its contents.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use walkdir::WalkDir;

use xzip::{CompressionMethod, SortOrder, XzipArchive, XzipResult};

#[derive(Parser)]
#[command(name = "vxzip", version, about = "Extract or build XZIP console-asset archives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every file in an archive into a directory
    Extract {
        /// Archive to read
        archive: PathBuf,
        /// Directory to extract into
        out_dir: PathBuf,
    },
    /// Build an archive from the files under a directory
    Build {
        /// Directory to pack
        input_dir: PathBuf,
        /// Archive to write
        archive: PathBuf,
        /// Align payloads to this power-of-two boundary
        #[arg(long)]
        align: Option<u32>,
        /// Write the compact (XZP2) central directory
        #[arg(long)]
        compact: bool,
        /// LZMA-compress every entry
        #[arg(long)]
        lzma: bool,
        /// Write all header fields big-endian
        #[arg(long)]
        big_endian: bool,
    },
    /// Print the archive directory
    List {
        /// Archive to read
        archive: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Extract { archive, out_dir } => extract(&archive, &out_dir),
        Command::Build {
            input_dir,
            archive,
            align,
            compact,
            lzma,
            big_endian,
        } => build(&input_dir, &archive, align, compact, lzma, big_endian),
        Command::List { archive } => list(&archive),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn extract(archive_path: &Path, out_dir: &Path) -> XzipResult<()> {
    let mut archive = XzipArchive::new();
    let mut source = archive.open_from_disk(archive_path)?;

    let names: Vec<String> = archive.entries().map(|e| e.file_name.clone()).collect();
    for name in names {
        let data = archive.read_file_from(&mut source, &name, false)?;
        let out_path = out_dir.join(name.replace('\\', "/"));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, data)?;
        info!(file = %out_path.display(), "extracted");
    }
    Ok(())
}

fn build(
    input_dir: &Path,
    archive_path: &Path,
    align: Option<u32>,
    compact: bool,
    lzma: bool,
    big_endian: bool,
) -> XzipResult<()> {
    let mut archive = XzipArchive::with_sort_order(SortOrder::ByName);
    archive.force_alignment(align.is_some(), !compact, align.unwrap_or(0));
    archive.set_big_endian(big_endian);

    let compression = if lzma {
        CompressionMethod::Lzma
    } else {
        CompressionMethod::Stored
    };

    for entry in WalkDir::new(input_dir) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(input_dir)
            .expect("walked path outside its root")
            .to_string_lossy()
            .replace('\\', "/");
        archive.add_file(&relative, entry.path(), compression)?;
        info!(file = %relative, "added");
    }

    archive.save_to_disk(File::create(archive_path)?)?;
    info!(
        archive = %archive_path.display(),
        entries = archive.len(),
        bytes = archive.calculate_size(),
        "archive written"
    );
    Ok(())
}

fn list(archive_path: &Path) -> XzipResult<()> {
    let mut archive = XzipArchive::new();
    archive.open_from_disk(archive_path)?;

    let mut cursor = -1;
    while let Some((next, name, size)) = archive.get_next_entry(cursor) {
        println!("{size:>10}  {name}");
        cursor = next;
    }
    Ok(())
}
