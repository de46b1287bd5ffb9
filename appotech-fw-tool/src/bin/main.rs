use std::path::{Path, PathBuf};

use appotech_fw::btinfo::BtInfoRecord;
use appotech_fw::btpairing::BtPairingDatabase;
use appotech_fw::{field, inject, load, load_at, Diagnostics, Loaded, Sector, SfxBlob};
use appotech_fw_tool::{
    extract_entries,
    load_audio_files,
    modified_image_path,
    read_image,
    report,
    write_and_check,
    Error,
};
use clap::{
    Args,
    Parser,
    Subcommand,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "appotech-fw")]
#[command(about = "Edit the configuration sectors of AppoTech speaker firmware", long_about = None)]
struct Cli {
    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manipulate the BTINF record
    #[command(after_help = "Available fields: flags, mic_unmute_thresh, mic_mute_thresh, \
                            mic_mute_duration, bt_name, bt_mac")]
    Btinfo(BtInfoArgs),
    /// Manipulate the BTPAIREDINFOHEAD pairing database
    #[command(after_help = "Available entry fields: link_key, bt_mac, bt_name, is_valid")]
    Btpairing(BtPairingArgs),
    /// Extract or repack the SFX blob
    Sfx(SfxArgs),
}

#[derive(Args)]
struct BtInfoArgs {
    /// Find and read the record from INFILE. An empty record is used otherwise
    #[arg(short = 'i', value_name = "INFILE")]
    input: Option<PathBuf>,

    /// Decode the record at this offset instead of searching for it
    #[arg(long, value_parser = parse_number)]
    offset: Option<usize>,

    /// Print the source record
    #[arg(short = 'p')]
    print_input: bool,

    /// Print the modified record
    #[arg(short = 'P')]
    print_output: bool,

    /// Assign a value to a field, e.g. -S bt_name "My speaker". Repeatable
    #[arg(short = 'S', num_args = 2, value_names = ["K", "V"])]
    assign: Vec<String>,

    /// Reset fields to their default value. Repeatable
    #[arg(short = 'C', num_args = 1.., value_name = "K")]
    clear: Vec<String>,

    /// Save just the modified record to OUTFILE
    #[arg(short = 'o', value_name = "OUTFILE")]
    output: Option<PathBuf>,

    /// Inject the modified record into INFILE and save the image to OUTFILE
    #[arg(short = 'O', value_name = "OUTFILE")]
    mod_output: Option<PathBuf>,
}

#[derive(Args)]
struct BtPairingArgs {
    /// Find and read the database from INFILE. A database with a single
    /// empty entry is used otherwise
    #[arg(short = 'i', value_name = "INFILE")]
    input: Option<PathBuf>,

    /// Decode the database at this offset instead of searching for it
    #[arg(long, value_parser = parse_number)]
    offset: Option<usize>,

    /// Print the source database
    #[arg(short = 'p')]
    print_input: bool,

    /// Print the modified database
    #[arg(short = 'P')]
    print_output: bool,

    /// Insert an empty entry at each index, processed one after another
    #[arg(short = 'a', num_args = 1.., value_name = "I", value_parser = parse_number)]
    add: Vec<usize>,

    /// Delete the entries at these indices, given in any order
    #[arg(short = 'd', num_args = 1.., value_name = "I", value_parser = parse_number)]
    delete: Vec<usize>,

    /// Assign a value to a field of an entry, e.g. -S 0 bt_name "Phone". Repeatable
    #[arg(short = 'S', num_args = 3, value_names = ["I", "K", "V"])]
    assign: Vec<String>,

    /// Reset a field of an entry to its default value, e.g. -C 3 link_key. Repeatable
    #[arg(short = 'C', num_args = 2, value_names = ["I", "K"])]
    clear: Vec<String>,

    /// Index of the most recently connected device (0 to 255)
    #[arg(short = 'x', value_name = "I")]
    paired_idx: Option<String>,

    /// Save just the modified database to OUTFILE
    #[arg(short = 'o', value_name = "OUTFILE")]
    output: Option<PathBuf>,

    /// Inject the modified database into INFILE and save the image to OUTFILE
    #[arg(short = 'O', value_name = "OUTFILE")]
    mod_output: Option<PathBuf>,

    /// Write a database that grew past its old region. The image never
    /// grows beyond its original size
    #[arg(short = 'f')]
    force: bool,
}

#[derive(Args)]
struct SfxArgs {
    /// A firmware image or SFX blob to extract from, or a directory of
    /// .mp3/.wav files to repack
    input: PathBuf,

    /// Decode the blob at this offset instead of searching for it
    #[arg(long, value_parser = parse_number)]
    offset: Option<usize>,

    /// Print a summary of the SFX blob
    #[arg(short = 'p', help_heading = "Extract")]
    print_input: bool,

    /// Carve the SFX blob out of INPUT and save it to OUTFILE
    #[arg(short = 'c', value_name = "OUTFILE", help_heading = "Extract")]
    carve: Option<PathBuf>,

    /// Export every entry to OUTDIR, creating it if needed
    #[arg(short = 'e', value_name = "OUTDIR", help_heading = "Extract")]
    extract: Option<PathBuf>,

    /// Save the repacked SFX blob to OUTFILE
    #[arg(short = 'o', value_name = "OUTFILE", help_heading = "Repack")]
    output: Option<PathBuf>,

    /// Replace the SFX blob of IMAGE, writing the result to IMAGE-mod.bin
    #[arg(short = 'O', value_name = "IMAGE", help_heading = "Repack")]
    inject: Option<PathBuf>,

    /// Write a blob that grew past its old region. The image never grows
    /// beyond its original size
    #[arg(short = 'f', help_heading = "Repack")]
    force: bool,
}

fn parse_number(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}

fn parse_index(s: &str) -> Result<usize, Error> {
    parse_number(s).map_err(|e| Error::InvalidArguments(format!("invalid index {s}: {e}")))
}

/// An input image and the sector decoded from it.
struct Source<T> {
    image: Vec<u8>,
    loaded: Loaded<T>,
}

fn load_source<T: Sector>(
    path: &Path,
    offset: Option<usize>,
    diag: &mut Diagnostics,
) -> Result<Source<T>, Error> {
    let image = read_image(path)?;
    let loaded = match offset {
        Some(offset) => load_at(&image, offset, diag)?,
        None => load(&image, diag)?,
    };
    tracing::info!(
        "found {} at {:#x}-{:#x}",
        T::KIND,
        loaded.location.offset,
        loaded.location.end()
    );
    report(diag);
    Ok(Source { image, loaded })
}

/// Write the standalone sector and/or the patched image.
fn save<T: Sector>(
    sector: &T,
    source: Option<&Source<T>>,
    output: Option<&Path>,
    mod_output: Option<&Path>,
    force: bool,
    diag: &mut Diagnostics,
) -> Result<(), Error> {
    if output.is_none() && mod_output.is_none() {
        return Err(Error::InvalidArguments("no output path specified".to_string()));
    }
    let encoded = sector.encode();

    if let Some(path) = output {
        tracing::info!("saving just the {}", T::KIND);
        write_and_check(path, &encoded)?;
    }
    if let Some(path) = mod_output {
        let source = source.ok_or_else(|| {
            Error::InvalidArguments("injecting requires an input image (-i)".to_string())
        })?;
        tracing::info!("injecting the modified {} into the source image", T::KIND);
        let patched = inject(&source.image, source.loaded.location, &encoded, force, diag);
        report(diag);
        write_and_check(path, &patched?)?;
    }
    Ok(())
}

/// Print the modified sector unless it encodes to `original`. Returns false
/// when nothing changed.
fn print_modified<T: Sector + std::fmt::Display>(sector: &T, original: &[u8]) -> bool {
    if sector.encode() == original {
        tracing::info!("no modifications were made");
        return false;
    }
    tracing::info!("printing the modified structure");
    println!("{sector}");
    true
}

fn run_btinfo(args: BtInfoArgs, diag: &mut Diagnostics) -> Result<(), Error> {
    let source = args
        .input
        .as_deref()
        .map(|path| load_source::<BtInfoRecord>(path, args.offset, diag))
        .transpose()?;
    let mut record = source
        .as_ref()
        .map(|s| s.loaded.sector.clone())
        .unwrap_or_default();
    let original = record.encode();

    if args.print_input {
        tracing::info!("MAC addresses are shown in human order");
        println!("{record}");
        let more = !args.assign.is_empty()
            || !args.clear.is_empty()
            || args.print_output
            || args.output.is_some()
            || args.mod_output.is_some();
        if !more {
            return Ok(());
        }
    }

    for pair in args.assign.chunks_exact(2) {
        field::assign(&mut record, &pair[0], &pair[1])?;
        tracing::info!("assigned btinfo.{} = {}", pair[0], pair[1]);
    }
    for name in &args.clear {
        field::clear(&mut record, name)?;
        tracing::info!("cleared btinfo.{name}");
    }

    if args.print_output && !print_modified(&record, &original) {
        return Ok(());
    }

    record.check_flags(diag);
    report(diag);
    save(
        &record,
        source.as_ref(),
        args.output.as_deref(),
        args.mod_output.as_deref(),
        false,
        diag,
    )
}

fn run_btpairing(args: BtPairingArgs, diag: &mut Diagnostics) -> Result<(), Error> {
    let source = args
        .input
        .as_deref()
        .map(|path| load_source::<BtPairingDatabase>(path, args.offset, diag))
        .transpose()?;
    let mut db = source
        .as_ref()
        .map(|s| s.loaded.sector.clone())
        .unwrap_or_default();
    let original = db.encode();

    if args.print_input {
        tracing::info!("MAC addresses are shown in human order");
        println!("{db}");
        let more = !args.add.is_empty()
            || !args.delete.is_empty()
            || !args.assign.is_empty()
            || !args.clear.is_empty()
            || args.paired_idx.is_some()
            || args.print_output
            || args.output.is_some()
            || args.mod_output.is_some();
        if !more {
            return Ok(());
        }
    }

    if !args.add.is_empty() {
        db.insert_entries(&args.add)?;
        tracing::info!("inserted empty entries at {:?}", args.add);
    }
    if !args.delete.is_empty() {
        db.delete_entries(&args.delete)?;
        tracing::info!("removed entries at {:?}", args.delete);
    }
    for triplet in args.assign.chunks_exact(3) {
        let index = parse_index(&triplet[0])?;
        field::assign(db.entry_mut(index)?, &triplet[1], &triplet[2])?;
        tracing::info!("assigned entries[{index}].{} = {}", triplet[1], triplet[2]);
    }
    for pair in args.clear.chunks_exact(2) {
        let index = parse_index(&pair[0])?;
        field::clear(db.entry_mut(index)?, &pair[1])?;
        tracing::info!("cleared entries[{index}].{}", pair[1]);
    }
    if let Some(value) = &args.paired_idx {
        field::assign(&mut db, "paired_idx", value)?;
        tracing::info!("assigned paired_idx = {value}");
    }

    if args.print_output && !print_modified(&db, &original) {
        return Ok(());
    }

    db.check_paired_idx(diag);
    report(diag);
    save(
        &db,
        source.as_ref(),
        args.output.as_deref(),
        args.mod_output.as_deref(),
        args.force,
        diag,
    )
}

fn print_sfx_summary(source: &Source<SfxBlob>) {
    let sep = "------------------------------";
    let location = source.loaded.location;
    let blob = &source.loaded.sector;

    println!("SFX BLOB SUMMARY");
    println!("{:<15}{}-{}", "Offset: ", location.offset, location.end());
    println!("{:<15}{}", "Entries: ", blob.entries.len());
    println!("{:<15}{} bytes", "Size: ", location.region_length);
    println!("{sep}");
    for (idx, entry) in blob.entries.iter().enumerate() {
        let start = location.offset + entry.offset() as usize;
        let end = start + entry.total_size();
        println!("Entry #{idx}");
        println!("{:<15}{start}-{end} (relative to file)", "Offset: ");
        println!("{entry}");
        println!("{sep}");
    }
}

fn run_sfx_extract(args: &SfxArgs, diag: &mut Diagnostics) -> Result<(), Error> {
    if args.output.is_some() || args.inject.is_some() {
        return Err(Error::InvalidArguments(
            "-o and -O need a directory of audio files as INPUT".to_string(),
        ));
    }
    if !args.print_input && args.carve.is_none() && args.extract.is_none() {
        return Err(Error::InvalidArguments(
            "nothing to do, use -p, -c or -e".to_string(),
        ));
    }

    let source = load_source::<SfxBlob>(&args.input, args.offset, diag)?;

    if args.print_input {
        print_sfx_summary(&source);
    }
    if let Some(path) = &args.carve {
        let location = source.loaded.location;
        tracing::info!("carving out the SFX blob");
        let region = source
            .image
            .get(location.offset..location.end())
            .ok_or(appotech_fw::Error::Truncated {
                expected: location.end(),
                actual: source.image.len(),
            })?;
        write_and_check(path, region)?;
    }
    if let Some(dir) = &args.extract {
        let result = extract_entries(&source.loaded.sector, dir, diag);
        report(diag);
        result?;
    }
    Ok(())
}

fn run_sfx_repack(args: &SfxArgs, diag: &mut Diagnostics) -> Result<(), Error> {
    if args.print_input || args.carve.is_some() || args.extract.is_some() {
        return Err(Error::InvalidArguments(
            "-p, -c and -e need a firmware image or SFX blob as INPUT".to_string(),
        ));
    }
    if args.output.is_none() && args.inject.is_none() {
        return Err(Error::InvalidArguments("no output path specified".to_string()));
    }

    let files = load_audio_files(&args.input)?;
    let blob = SfxBlob::build_from_files(&files, diag);
    report(diag);
    let blob = blob?;

    if let Some(path) = &args.output {
        tracing::info!("creating SFX blob {}", path.display());
        write_and_check(path, &blob.encode())?;
    }
    if let Some(image_path) = &args.inject {
        let source = load_source::<SfxBlob>(image_path, args.offset, diag)?;
        save(
            &blob,
            Some(&source),
            None,
            Some(modified_image_path(image_path).as_path()),
            args.force,
            diag,
        )?;
    }
    Ok(())
}

fn run_sfx(args: SfxArgs, diag: &mut Diagnostics) -> Result<(), Error> {
    if args.input.is_file() {
        run_sfx_extract(&args, diag)
    } else if args.input.is_dir() {
        run_sfx_repack(&args, diag)
    } else {
        Err(Error::InvalidArguments(format!(
            "unknown input {}",
            args.input.display()
        )))
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut diag = Diagnostics::new();
    match cli.command {
        Commands::Btinfo(args) => run_btinfo(args, &mut diag)?,
        Commands::Btpairing(args) => run_btpairing(args, &mut diag)?,
        Commands::Sfx(args) => run_sfx(args, &mut diag)?,
    }
    Ok(())
}
