use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use appotech_fw::btinfo::{self, BtInfoRecord};
use appotech_fw::btpairing::{self, BtPairingDatabase, PairingEntry};
use appotech_fw::sfx::wav::PcmAudio;
use appotech_fw::{load, Diagnostics, Sector, SfxBlob, SourceFile};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const CODE_BYTE: u8 = 0x5A;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_appotech-fw"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn embed(sector: &[u8], before: usize, after: usize) -> Vec<u8> {
    let mut image = vec![CODE_BYTE; before];
    image.extend_from_slice(sector);
    image.extend(std::iter::repeat_n(CODE_BYTE, after));
    image
}

fn wav(samples: usize) -> Vec<u8> {
    PcmAudio {
        channels: 1,
        sample_rate: 8000,
        sample_width: 1,
        frames: vec![0x10; samples],
    }
    .to_bytes()
}

#[test]
fn btinfo_edit_and_inject() {
    let dir = tempdir().unwrap();
    let record = BtInfoRecord {
        flags: btinfo::FLAG_CUST_BT_NAME,
        bt_name: "Old".to_string(),
        ..Default::default()
    };
    let image = embed(&record.encode(), 0x300, 0x200);
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw-mod.bin");
    fs::write(&input, &image).unwrap();

    let out = run(&[
        "btinfo",
        "-i",
        arg(&input),
        "-S",
        "bt_name",
        "New Name",
        "-S",
        "flags",
        "3",
        "-S",
        "bt_mac",
        "AA:BB:CC:DD:EE:FF",
        "-O",
        arg(&output),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), image.len());
    assert_eq!(patched[..0x300], image[..0x300]);
    assert_eq!(patched[0x340..], image[0x340..]);

    let mut diag = Diagnostics::new();
    let loaded = load::<BtInfoRecord>(&patched, &mut diag).unwrap();
    assert_eq!(loaded.sector.bt_name, "New Name");
    assert_eq!(loaded.sector.bt_mac, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    assert!(diag.is_empty());
}

#[test]
fn btinfo_standalone_from_scratch() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("btinfo.bin");

    let out = run(&["btinfo", "-S", "bt_name", "Speaker", "-o", arg(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let raw = fs::read(&output).unwrap();
    assert_eq!(raw.len(), btinfo::SIZE);
    let mut diag = Diagnostics::new();
    let record = BtInfoRecord::decode(&raw, &mut diag).unwrap();
    assert_eq!(record.bt_name, "Speaker");
    assert!(diag.is_empty());
}

#[test]
fn btinfo_rejects_bad_requests() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("btinfo.bin");

    // no output
    assert!(!run(&["btinfo", "-S", "bt_name", "Speaker"]).status.success());
    // unknown field
    assert!(!run(&["btinfo", "-S", "volume", "3", "-o", arg(&output)]).status.success());
    // name too long
    let long = "x".repeat(33);
    assert!(!run(&["btinfo", "-S", "bt_name", &long, "-o", arg(&output)]).status.success());
    // injecting without a source image
    assert!(!run(&["btinfo", "-O", arg(&output)]).status.success());
    assert!(!output.exists());
}

#[test]
fn btinfo_print_only() {
    let out = run(&["btinfo", "-p"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("bt_name"));
    assert!(stdout.contains("checksum"));
}

#[test]
fn btpairing_growth_needs_force() {
    let dir = tempdir().unwrap();
    let db = BtPairingDatabase {
        entries: vec![PairingEntry {
            bt_name: "Phone".to_string(),
            is_valid: true,
            ..Default::default()
        }],
        paired_idx: 0,
    };
    let image = embed(&db.encode(), 0x100, 0x200);
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw-mod.bin");
    fs::write(&input, &image).unwrap();

    let args = [
        "btpairing",
        "-i",
        arg(&input),
        "-a",
        "1",
        "-S",
        "1",
        "bt_name",
        "Laptop",
        "-S",
        "1",
        "is_valid",
        "1",
        "-x",
        "1",
        "-O",
        arg(&output),
    ];
    assert!(!run(&args).status.success());
    assert!(!output.exists());

    let mut forced = args.to_vec();
    forced.push("-f");
    let out = run(&forced);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), image.len());
    let mut diag = Diagnostics::new();
    let loaded = load::<BtPairingDatabase>(&patched, &mut diag).unwrap();
    let names: Vec<_> = loaded.sector.entries.iter().map(|e| e.bt_name.as_str()).collect();
    assert_eq!(names, vec!["Phone", "Laptop"]);
    assert_eq!(loaded.sector.paired_idx, 1);
}

#[test]
fn btpairing_delete_pads_the_region() {
    let dir = tempdir().unwrap();
    let entry = |name: &str| PairingEntry {
        bt_name: name.to_string(),
        is_valid: true,
        ..Default::default()
    };
    let db = BtPairingDatabase {
        entries: vec![entry("a"), entry("b"), entry("c")],
        paired_idx: 2,
    };
    let raw = db.encode();
    let image = embed(&raw, 0x100, 0x200);
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw-mod.bin");
    fs::write(&input, &image).unwrap();

    let out = run(&[
        "btpairing",
        "-i",
        arg(&input),
        "-d",
        "2",
        "0",
        "-x",
        "0",
        "-O",
        arg(&output),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let patched = fs::read(&output).unwrap();
    let new_len = btpairing::HEADER_SIZE + btpairing::ENTRY_SIZE + 1;
    let end = 0x100 + raw.len();
    assert!(patched[0x100 + new_len..end].iter().all(|&b| b == 0xFF));
    assert_eq!(patched[end..], image[end..]);

    let mut diag = Diagnostics::new();
    let loaded = load::<BtPairingDatabase>(&patched, &mut diag).unwrap();
    assert_eq!(loaded.sector.entries.len(), 1);
    assert_eq!(loaded.sector.entries[0].bt_name, "b");
}

#[test]
fn btpairing_print_unchanged_stops_early() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("db.bin");

    let out = run(&["btpairing", "-P", "-o", arg(&output)]);
    assert!(out.status.success());
    assert!(!output.exists());
}

#[test]
fn sfx_repack_extract_and_inject() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("audio");
    fs::create_dir(&audio).unwrap();
    fs::write(audio.join("B-beep.WAV"), wav(300)).unwrap();
    fs::write(audio.join("a-tune.mp3"), vec![0xE3; 700]).unwrap();
    fs::write(audio.join("notes.txt"), b"not audio").unwrap();

    // repack into a standalone blob
    let blob_path = dir.path().join("sfx.bin");
    let out = run(&["sfx", arg(&audio), "-o", arg(&blob_path)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let raw = fs::read(&blob_path).unwrap();
    let mut diag = Diagnostics::new();
    let blob = SfxBlob::decode(&raw, &mut diag).unwrap();
    let formats: Vec<_> = blob.entries.iter().map(|e| e.format_name()).collect();
    assert_eq!(formats, vec!["MP3", "WAV"]);

    // extract the entries again
    let extracted = dir.path().join("extracted");
    let out = run(&["sfx", arg(&blob_path), "-p", "-e", arg(&extracted)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("SFX BLOB SUMMARY"));
    assert_eq!(fs::read(extracted.join("sfx-000.mp3")).unwrap()[..700], vec![0xE3; 700][..]);
    let wav_back = PcmAudio::parse(&fs::read(extracted.join("sfx-001.wav")).unwrap()).unwrap();
    assert_eq!(wav_back.frames[..300], vec![0x10; 300][..]);

    // inject a bigger blob into an image holding a smaller one
    let small = SfxBlob::build_from_files(
        &[SourceFile::new("x.mp3", vec![1; 0x100])],
        &mut diag,
    )
    .unwrap()
    .encode();
    let image = embed(&small, 0x1000, 0x2000);
    let image_path = dir.path().join("fw.bin");
    fs::write(&image_path, &image).unwrap();

    assert!(!run(&["sfx", arg(&audio), "-O", arg(&image_path)]).status.success());
    let out = run(&["sfx", arg(&audio), "-O", arg(&image_path), "-f"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let patched = fs::read(dir.path().join("fw.bin-mod.bin")).unwrap();
    assert_eq!(patched.len(), image.len());
    assert_eq!(patched[0x1000..0x1000 + raw.len()], raw[..]);

    // carve it back out
    let carved = dir.path().join("carved.bin");
    let mod_path = dir.path().join("fw.bin-mod.bin");
    let out = run(&["sfx", arg(&mod_path), "-c", arg(&carved)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read(&carved).unwrap(), raw);
}

#[test]
fn sfx_mode_mismatch() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("fw.bin");
    fs::write(&file, vec![0u8; 0x1000]).unwrap();

    assert!(!run(&["sfx", arg(&file), "-o", "out.bin"]).status.success());
    assert!(!run(&["sfx", arg(dir.path()), "-p"]).status.success());
    assert!(!run(&["sfx", arg(&dir.path().join("missing"))]).status.success());
}
