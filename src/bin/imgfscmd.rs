//! `imgfscmd`: the offline command-line interface to an imgFS store —
//! list, create, read, insert, delete.

use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use imgfs::error::{ErrorKind, Result};
use imgfs::format::Resolution;
use imgfs::store::StoreFile;

const DEFAULT_MAX_FILES: u32 = 128;
const DEFAULT_THUMB_RES: u16 = 64;
const DEFAULT_SMALL_RES: u16 = 256;
const MAX_THUMB_RES: u16 = 128;
const MAX_SMALL_RES: u16 = 512;

#[derive(Parser)]
#[command(name = "imgfscmd", about = "imgFS command line interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List an imgFS's content.
    List { imgfs_filename: String },
    /// Create a new imgFS.
    Create {
        imgfs_filename: String,
        #[command(flatten)]
        opts: CreateOpts,
    },
    /// Read an image from the imgFS and save it to disk.
    Read {
        imgfs_filename: String,
        img_id: String,
        /// `original`/`orig`, `thumbnail`/`thumb`, or `small`.
        #[arg(default_value = "original")]
        resolution: String,
    },
    /// Insert a new image into the imgFS.
    Insert { imgfs_filename: String, img_id: String, filename: String },
    /// Delete an image from the imgFS.
    Delete { imgfs_filename: String, img_id: String },
}

#[derive(Args)]
struct CreateOpts {
    #[arg(long = "max-files", default_value_t = DEFAULT_MAX_FILES)]
    max_files: u32,
    #[arg(long = "thumb-res", num_args = 2, default_values_t = [DEFAULT_THUMB_RES, DEFAULT_THUMB_RES])]
    thumb_res: Vec<u16>,
    #[arg(long = "small-res", num_args = 2, default_values_t = [DEFAULT_SMALL_RES, DEFAULT_SMALL_RES])]
    small_res: Vec<u16>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(e.kind.exit_code() as u8)
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::List { imgfs_filename } => {
            let store = StoreFile::open(&imgfs_filename)?;
            print!("{}", store.list_text());
            Ok(())
        }
        Command::Create { imgfs_filename, opts } => {
            if opts.max_files == 0 {
                return Err(ErrorKind::MaxFiles.into());
            }
            check_resolution(opts.thumb_res[0], opts.thumb_res[1], MAX_THUMB_RES)?;
            check_resolution(opts.small_res[0], opts.small_res[1], MAX_SMALL_RES)?;

            let resized_res = [opts.thumb_res[0], opts.thumb_res[1], opts.small_res[0], opts.small_res[1]];
            let store = StoreFile::create(&imgfs_filename, opts.max_files, resized_res)?;
            store.close();
            Ok(())
        }
        Command::Read { imgfs_filename, img_id, resolution } => {
            let res = Resolution::from_name(&resolution).ok_or(ErrorKind::Resolutions)?;
            let mut store = StoreFile::open(&imgfs_filename)?;
            let bytes = store.read(&img_id, res)?;
            let out_name = output_name(&img_id, res);
            fs::write(&out_name, bytes)?;
            Ok(())
        }
        Command::Insert { imgfs_filename, img_id, filename } => {
            let bytes = fs::read(&filename)?;
            let mut store = StoreFile::open(&imgfs_filename)?;
            store.insert(&bytes, &img_id)
        }
        Command::Delete { imgfs_filename, img_id } => {
            let mut store = StoreFile::open(&imgfs_filename)?;
            store.delete(&img_id)
        }
    }
}

fn check_resolution(width: u16, height: u16, max: u16) -> Result<()> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(ErrorKind::Resolutions.into());
    }
    Ok(())
}

/// `<img_id>.jpg` for the original resolution, `<img_id>_thumb.jpg` /
/// `<img_id>_small.jpg` for a derived one.
fn output_name(img_id: &str, res: Resolution) -> String {
    match res {
        Resolution::Orig => format!("{img_id}.jpg"),
        Resolution::Thumb => format!("{img_id}_thumb.jpg"),
        Resolution::Small => format!("{img_id}_small.jpg"),
    }
}
