//! File handling around the `appotech-fw` codecs: reading images, writing
//! verified outputs, collecting audio files for an SFX repack and naming
//! extracted entries.

pub mod error;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use appotech_fw::{Diagnostics, SfxBlob, SfxEntry, SourceFile};

pub use error::Error;

/// File extensions accepted by [`list_audio_files`], lower case.
pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Read a whole firmware image (or standalone sector) into memory.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    tracing::info!("read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

/// Write `data` to `path` and check that the file ended up with exactly
/// `data.len()` bytes.
pub fn write_and_check<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), Error> {
    let path = path.as_ref();
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.flush()?;

    let actual = file.metadata()?.len() as usize;
    if actual != data.len() {
        return Err(Error::PartialWrite {
            path: path.to_path_buf(),
            expected: data.len(),
            actual,
        });
    }
    tracing::info!("wrote {actual} bytes to {}", path.display());
    Ok(())
}

/// List the `.mp3`/`.wav` files directly inside `dir`, sorted by file name
/// ignoring case.
pub fn list_audio_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_audio = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                AUDIO_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_audio {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

/// Read every audio file of `dir` in repack order.
pub fn load_audio_files<P: AsRef<Path>>(dir: P) -> Result<Vec<SourceFile>, Error> {
    let files = list_audio_files(dir)?
        .into_iter()
        .map(|path| {
            let data = fs::read(&path)?;
            Ok(SourceFile::new(path, data))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    tracing::info!("discovered {} audio files", files.len());
    Ok(files)
}

/// File name of the `index`-th extracted entry, e.g. `sfx-007.wav`.
pub fn extract_file_name(index: usize, entry: &SfxEntry) -> String {
    format!("sfx-{index:03}.{}", entry.format_name().to_lowercase())
}

/// Export every entry of `blob` as a standalone audio file into `dir`,
/// creating the directory if needed. Returns the written paths.
pub fn extract_entries<P: AsRef<Path>>(
    blob: &SfxBlob,
    dir: P,
    diag: &mut Diagnostics,
) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        tracing::info!("created directory {}", dir.display());
    }

    let mut written = Vec::with_capacity(blob.entries.len());
    for (index, entry) in blob.entries.iter().enumerate() {
        let path = dir.join(extract_file_name(index, entry));
        write_and_check(&path, &entry.export_to_file(diag))?;
        written.push(path);
    }
    tracing::info!("extracted {} entries to {}", written.len(), dir.display());
    Ok(written)
}

/// Path the injected image is written to when only the source image is
/// known: `<image>-mod.bin`.
pub fn modified_image_path<P: AsRef<Path>>(image: P) -> PathBuf {
    let mut name = image.as_ref().as_os_str().to_owned();
    name.push("-mod.bin");
    PathBuf::from(name)
}

/// Emit the collected warnings through `tracing` and empty the sink.
pub fn report(diag: &mut Diagnostics) {
    for warning in diag.drain() {
        tracing::warn!("{warning}");
    }
}
