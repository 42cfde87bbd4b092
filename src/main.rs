//! `ext4extract` extracts the contents of an ext4 image or block device into a directory.

mod extract;

use ext4::Ext4;
use ext4::ExtentAddressing;
use extract::Extractor;
use extract::SymlinkMode;
use extract::sidecar::Sink;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::exit;

/// Writes an error to stderr, then exits.
fn error<M: fmt::Display>(msg: M) -> ! {
    eprintln!("ext4extract: error: {msg}");
    exit(1);
}

/// Writes a usage error to stderr, then exits.
fn usage_error<M: fmt::Display>(msg: M) -> ! {
    eprintln!("ext4extract: {msg}");
    eprintln!("Try 'ext4extract --help' for more information.");
    exit(2);
}

/// Prints command help.
fn print_help() {
    println!("Usage:");
    println!(" ext4extract [options] <filename>");
    println!();
    println!("Extracts the contents of an EXT4 device or image into a directory.");
    println!();
    println!("Options:");
    println!(" -h, --help\t\t\t  Prints help.");
    println!(" -v, --verbose\t\t\t  Prints each extracted path.");
    println!(" -D, --directory <dir>\t\t  Sets the output directory (default `.`).");
    println!(" -S, --dump-symlink-table <file>  Writes the symlink table to <file>.");
    println!(" -M, --dump-metadata <file>\t  Writes the inode metadata table to <file>.");
    println!(" --save-symlinks\t\t  Saves symlinks as is (default).");
    println!(" --text-symlinks\t\t  Saves symlinks as text files holding the target.");
    println!(" --empty-symlinks\t\t  Saves symlinks as empty files.");
    println!(" --skip-symlinks\t\t  Does not save symlinks.");
    println!(" --absolute-extents\t\t  Reads extents with absolute block addresses.");
}

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// If true, print each extracted path.
    verbose: bool,
    /// The output directory.
    directory: Option<PathBuf>,
    /// The path of the symlink table, if enabled.
    symlink_table: Option<PathBuf>,
    /// The path of the metadata table, if enabled.
    metadata_table: Option<PathBuf>,
    /// The symlink materialization mode.
    symlink_mode: Option<SymlinkMode>,
    /// If true, read extents with absolute block addresses.
    absolute_extents: bool,
    /// The path of the image to extract.
    filename: Option<PathBuf>,
}

/// Returns the value of the option `opt`.
fn value_of(args: &mut impl Iterator<Item = OsString>, opt: &str) -> PathBuf {
    args.next().map(PathBuf::from).unwrap_or_else(|| {
        usage_error(format_args!("option `{opt}` requires a value"));
    })
}

/// Selects the symlink mode, rejecting conflicting flags.
fn set_symlink_mode(res: &mut Args, mode: SymlinkMode) {
    if res.symlink_mode.is_some_and(|prev| prev != mode) {
        usage_error("conflicting symlink options");
    }
    res.symlink_mode = Some(mode);
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Args {
    let mut res: Args = Default::default();
    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            Some("-v" | "--verbose") => res.verbose = true,
            Some(opt @ ("-D" | "--directory")) => {
                res.directory = Some(value_of(&mut args, opt));
            }
            Some(opt @ ("-S" | "--dump-symlink-table")) => {
                res.symlink_table = Some(value_of(&mut args, opt));
            }
            Some(opt @ ("-M" | "--dump-metadata")) => {
                res.metadata_table = Some(value_of(&mut args, opt));
            }
            Some("--save-symlinks") => set_symlink_mode(&mut res, SymlinkMode::Save),
            Some("--text-symlinks") => set_symlink_mode(&mut res, SymlinkMode::Text),
            Some("--empty-symlinks") => set_symlink_mode(&mut res, SymlinkMode::Empty),
            Some("--skip-symlinks") => set_symlink_mode(&mut res, SymlinkMode::Skip),
            Some("--absolute-extents") => res.absolute_extents = true,
            Some(opt) if opt.len() > 1 && opt.starts_with('-') => {
                usage_error(format_args!("invalid option `{opt}`"));
            }
            _ => {
                if res.filename.is_some() {
                    usage_error("too many operands");
                }
                res.filename = Some(arg.into());
            }
        }
    }
    res
}

fn main() {
    let args = parse_args(env::args_os().skip(1));
    if args.help {
        print_help();
        exit(0);
    }
    let Some(filename) = args.filename else {
        usage_error("missing operand");
    };
    let mut fs = Ext4::open(&filename).unwrap_or_else(|e| {
        error(format_args!("{}: {e}", filename.display()));
    });
    if args.absolute_extents {
        fs.set_addressing(ExtentAddressing::Absolute);
    }
    if args.verbose {
        println!("{}", fs.info());
    }
    let symlink_table = args
        .symlink_table
        .map(|path| Sink::create(path).unwrap_or_else(|e| error(e)));
    let metadata_table = args
        .metadata_table
        .map(|path| Sink::create(path).unwrap_or_else(|e| error(e)));
    let mut extractor = Extractor {
        fs,
        verbose: args.verbose,
        symlink_mode: args.symlink_mode.unwrap_or_default(),
        symlink_table,
        metadata_table,
    };
    let directory = args.directory.unwrap_or_else(|| PathBuf::from("."));
    extractor.run(&directory).unwrap_or_else(|e| error(e));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(args: &[&str]) -> Args {
        parse_args(args.iter().map(|arg| OsString::from(*arg)))
    }

    #[test]
    fn args_defaults() {
        let args = args_of(&["image.ext4"]);
        assert!(!args.help);
        assert!(!args.verbose);
        assert!(!args.absolute_extents);
        assert_eq!(args.directory, None);
        assert_eq!(args.symlink_table, None);
        assert_eq!(args.metadata_table, None);
        assert_eq!(args.symlink_mode, None);
        assert_eq!(args.filename, Some(PathBuf::from("image.ext4")));
    }

    #[test]
    fn args_options() {
        let args = args_of(&[
            "-v",
            "-D",
            "out",
            "-S",
            "symlinks.txt",
            "-M",
            "meta.txt",
            "--text-symlinks",
            "--absolute-extents",
            "image.ext4",
        ]);
        assert!(args.verbose);
        assert!(args.absolute_extents);
        assert_eq!(args.directory, Some(PathBuf::from("out")));
        assert_eq!(args.symlink_table, Some(PathBuf::from("symlinks.txt")));
        assert_eq!(args.metadata_table, Some(PathBuf::from("meta.txt")));
        assert_eq!(args.symlink_mode, Some(SymlinkMode::Text));
        assert_eq!(args.filename, Some(PathBuf::from("image.ext4")));
    }
}
