use std::fs;

use appotech_fw::sfx::wav::PcmAudio;
use appotech_fw::{Diagnostics, SfxBlob, SourceFile};
use appotech_fw_tool::{extract_entries, list_audio_files, load_audio_files, read_image, write_and_check, Error};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn write_then_read() {
    let file = NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..=255).collect();
    write_and_check(file.path(), &data).unwrap();
    assert_eq!(read_image(file.path()).unwrap(), data);
}

#[test]
fn read_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        read_image(dir.path().join("nope.bin")),
        Err(Error::Io(_))
    ));
}

#[test]
fn audio_files_are_filtered_and_sorted() {
    let dir = tempdir().unwrap();
    for name in ["b.wav", "C.MP3", "a.Wav", "readme.txt", "mp3", "d.mp3.bak"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    fs::create_dir(dir.path().join("e.wav")).unwrap();

    let names: Vec<_> = list_audio_files(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.Wav", "b.wav", "C.MP3"]);

    let files = load_audio_files(dir.path()).unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[2].data, b"x");
}

#[test]
fn extract_creates_the_directory() {
    let wav = PcmAudio {
        channels: 1,
        sample_rate: 8000,
        sample_width: 1,
        frames: vec![0x40; 10],
    }
    .to_bytes();
    let mut diag = Diagnostics::new();
    let blob = SfxBlob::build_from_files(
        &[
            SourceFile::new("one.wav", wav),
            SourceFile::new("two.mp3", vec![7; 5]),
        ],
        &mut diag,
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let target = dir.path().join("out").join("sfx");
    let written = extract_entries(&blob, &target, &mut diag).unwrap();
    assert_eq!(
        written,
        vec![target.join("sfx-000.wav"), target.join("sfx-001.mp3")]
    );

    let mp3 = fs::read(target.join("sfx-001.mp3")).unwrap();
    assert_eq!(mp3.len(), 0x100);
    assert_eq!(mp3[..5], [7; 5]);
    assert!(diag.is_empty());
}
