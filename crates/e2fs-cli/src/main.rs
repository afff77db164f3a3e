#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use e2fs_block::FileByteDevice;
use e2fs_core::Volume;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "e2fs", about = "User-space ext2 driver")]
struct Cli {
    /// Path to the block device or filesystem image.
    drive: PathBuf,

    /// Print the root stat record as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let dev = FileByteDevice::open(&cli.drive)
        .with_context(|| format!("failed to open drive {}", cli.drive.display()))?;
    if !dev.is_writable() {
        warn!("drive opened read-only; unmount will not write the superblock back");
    }

    let volume = Volume::try_mount(Box::new(dev)).context("failed to mount drive")?;

    let st = volume.stat("/", "").context("failed to stat /")?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&st).context("serialize stat record")?
        );
    } else {
        println!("Inode {}", st.ino);
        println!("    Size: {}", st.size);
        println!("    Blocks: {}", st.blocks);
        println!("    Links: {}", st.nlink);
        println!("    Mode: {:o}", st.mode);
        println!("    UID: {}", st.uid);
        println!("    GID: {}", st.gid);
        println!("    Access: {}", st.atime);
        println!("    Modify: {}", st.mtime);
        println!("    Change: {}", st.ctime);
    }

    let root = volume.open_dir("/", "").context("failed to open /")?;
    println!("Directory:");
    for entry in root.entries() {
        println!("    {}", entry.name_str());
    }

    Ok(())
}
