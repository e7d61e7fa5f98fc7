use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use strata_untar::{Compression, ExtractOptions, IdMap, IdRange, PathWhitelist, Untar};
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct ExtractArg {
    /// Archive to read, `-` for stdin
    pub archive: PathBuf,

    /// Directory to extract into
    pub target: PathBuf,

    /// Anchor for absolute symlink targets found in the archive (defaults to the target)
    #[arg(long)]
    pub absolute_root: Option<PathBuf>,

    /// none, gzip, bzip2, xz, zstd or detect
    #[arg(short, long, default_value = "detect", value_parser = parse_compression)]
    pub compression: Compression,

    /// Apply default modes instead of the archive's
    #[arg(long)]
    pub no_preserve_permissions: bool,

    /// Keep archive owners, passed through --uid-map / --gid-map
    #[arg(long)]
    pub preserve_owners: bool,

    /// Do not create device nodes or FIFOs
    #[arg(long)]
    pub skip_special_devices: bool,

    /// Owner for every extracted object when owners are not preserved
    #[arg(long)]
    pub uid: Option<u32>,

    #[arg(long)]
    pub gid: Option<u32>,

    /// Octal permission bits added to every applied mode
    #[arg(long, value_parser = parse_octal)]
    pub mask: Option<u32>,

    /// Only extract these absolute paths; a trailing `/` allows a whole directory
    #[arg(long = "allow", value_name = "PATH")]
    pub allow: Vec<String>,

    /// uid range `inside:outside:count`, repeatable
    #[arg(long = "uid-map", value_name = "RANGE")]
    pub uid_map: Vec<IdRange>,

    /// gid range `inside:outside:count`, repeatable
    #[arg(long = "gid-map", value_name = "RANGE")]
    pub gid_map: Vec<IdRange>,
}

impl ExtractArg {
    fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::default()
            .compression(self.compression)
            .preserve_permissions(!self.no_preserve_permissions)
            .preserve_owners(self.preserve_owners)
            .skip_special_devices(self.skip_special_devices)
            .whitelist(PathWhitelist::new(self.allow.iter().cloned()));

        if let Some(root) = &self.absolute_root {
            options = options.absolute_root(root);
        }
        if self.uid.is_some() || self.gid.is_some() {
            let current = options.default_owner;
            options = options.owner(
                self.uid.unwrap_or(current.uid),
                self.gid.unwrap_or(current.gid),
            );
        }
        if let Some(mask) = self.mask {
            options = options.included_permission_mask(mask);
        }
        if !self.uid_map.is_empty() {
            options = options.owner_mapper(Arc::new(IdMap::new(self.uid_map.iter().copied())));
        }
        if !self.gid_map.is_empty() {
            options = options.group_mapper(Arc::new(IdMap::new(self.gid_map.iter().copied())));
        }
        options
    }

    fn open(&self) -> Result<Box<dyn Read>> {
        if self.archive.as_os_str() == "-" {
            return Ok(Box::new(io::stdin().lock()));
        }
        let file = File::open(&self.archive)
            .with_context(|| format!("Failed to open archive {}", self.archive.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn run(arg: ExtractArg) -> Result<()> {
    let reader = arg.open()?;
    let untar = Untar::new(&arg.target, arg.options())
        .with_context(|| format!("Failed to prepare extraction into {}", arg.target.display()))?;

    let report = untar
        .extract(reader)
        .with_context(|| format!("Failed to extract {}", arg.archive.display()))?;

    info!(
        entries = report.entries,
        skipped = report.skipped,
        bytes = report.bytes_written,
        "done"
    );
    println!(
        "{} entries extracted into {} ({} skipped, {} bytes)",
        report.entries - report.skipped,
        arg.target.display(),
        report.skipped,
        report.bytes_written
    );
    Ok(())
}

fn parse_compression(s: &str) -> Result<Compression, String> {
    s.parse().map_err(|e: strata_untar::Error| e.to_string())
}

fn parse_octal(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode '{s}': {e}"))
}
