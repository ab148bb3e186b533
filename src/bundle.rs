//! Button-page bundle builder: renders a [`Button`] grid into the
//! zip archive the device expects for `SET_BUTTONS` / `PARTIALLY_UPDATE_BUTTONS`.
//!
//! Archives are cached by the MD5 of their manifest under `build_dir()`, and
//! re-zipped with growing dummy padding until no forbidden byte
//! (`0x00` or `0x7C`) lands at a record boundary (spec.md §4.3 — the device
//! firmware treats those bytes as frame markers inside a raw chunk).

use crate::config::{self, BUNDLE_INITIAL_DUMMY_RETRIES, BUNDLE_RETRY_SLEEP_MS, RECORD_SIZE};
use crate::error::BundleError;
use crate::types::Button;
use md5::{Digest, Md5};
use rand::Rng;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const FORBIDDEN_BYTES: [u8; 2] = [0x00, 0x7C];
const FIRST_FORBIDDEN_OFFSET: u64 = 1016;

/// Build (or reuse, if cached) the zip archive for one button page and
/// return its path. `buttons` maps button index -> configuration; icons
/// referenced by name are copied in from `icons_dir()`.
pub fn prepare_bundle(buttons: &BTreeMap<usize, Button>, icons_dir: &Path) -> Result<PathBuf, BundleError> {
    let build_path = config::build_dir();
    let page_path = build_path.join("page");

    if page_path.exists() {
        fs::remove_dir_all(&page_path)?;
    }
    fs::create_dir_all(page_path.join("icons"))?;

    let (manifest, icon_names) = build_manifest(buttons);
    let manifest_data = serde_json::to_vec_pretty(&manifest)?;

    let hash = format!("{:x}", Md5::digest(&manifest_data));
    let archive_path = build_path.join(format!("{hash}.zip"));
    if archive_path.exists() {
        debug!(%hash, "reusing cached button bundle");
        return Ok(archive_path);
    }

    fs::write(page_path.join("manifest.json"), &manifest_data)?;

    for icon in &icon_names {
        let src = icons_dir.join(icon);
        let dst = page_path.join("icons").join(icon);
        if src.exists() {
            fs::copy(&src, &dst)?;
        }
    }

    let build_zip_path = build_path.join(".build.zip");
    let dummy_path = page_path.join("dummy.txt");

    let mut dummy = String::new();
    let mut retries = BUNDLE_INITIAL_DUMMY_RETRIES;

    loop {
        if retries > 0 {
            dummy.push_str(&random_string(8 * retries as usize));
            fs::write(&dummy_path, &dummy)?;
        }

        zip_folder(&page_path, &build_zip_path)?;

        if archive_is_clean(&build_zip_path)? {
            break;
        }

        retries += 1;
        std::thread::sleep(std::time::Duration::from_millis(BUNDLE_RETRY_SLEEP_MS));
    }

    fs::rename(&build_zip_path, &archive_path)?;
    Ok(archive_path)
}

fn build_manifest(buttons: &BTreeMap<usize, Button>) -> (Value, Vec<String>) {
    let mut manifest = Map::new();
    let mut icons = Vec::new();

    for (&index, button) in buttons {
        let row = index / config::BUTTON_COLS;
        let col = index % config::BUTTON_COLS;

        let mut param = Map::new();
        if let Some(name) = &button.name {
            if !name.is_empty() {
                param.insert("Text".to_string(), json!(name));
            }
        }
        if let Some(icon) = &button.icon {
            if !icon.is_empty() {
                icons.push(icon.clone());
                param.insert("Icon".to_string(), json!(format!("icons/{icon}")));
            }
        }

        let entry = json!({
            "State": 0,
            "ViewParam": [param],
        });
        manifest.insert(format!("{col}_{row}"), entry);
    }

    (Value::Object(manifest), icons)
}

fn random_string(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

/// Walk `src_dir` and write a zip archive at `dst_file`: directories stored,
/// files deflated, paths relative to `src_dir` with forward slashes.
fn zip_folder(src_dir: &Path, dst_file: &Path) -> Result<(), BundleError> {
    let file = fs::File::create(dst_file)?;
    let mut writer = zip::ZipWriter::new(file);

    let mut entries: Vec<PathBuf> = Vec::new();
    collect_entries(src_dir, src_dir, &mut entries)?;
    entries.sort();

    let file_options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let dir_options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for path in entries {
        let rel = path.strip_prefix(src_dir).unwrap();
        let name = rel.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            writer.add_directory(format!("{name}/"), dir_options)?;
        } else {
            writer.start_file(name, file_options)?;
            let mut contents = Vec::new();
            fs::File::open(&path)?.read_to_end(&mut contents)?;
            writer.write_all(&contents)?;
        }
    }

    writer.finish()?;
    Ok(())
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BundleError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path != root {
            out.push(path.clone());
        }
        if path.is_dir() {
            collect_entries(root, &path, out)?;
        }
    }
    Ok(())
}

/// Scan every byte at offset `1016 + 1024k` for a record-boundary marker
/// collision (`0x00` or `0x7C`).
fn archive_is_clean(path: &Path) -> Result<bool, BundleError> {
    let mut file = fs::File::open(path)?;
    let len = file.metadata()?.len();

    let mut offset = FIRST_FORBIDDEN_OFFSET;
    let mut byte = [0u8; 1];
    while offset < len {
        file.seek(SeekFrom::Start(offset))?;
        match file.read(&mut byte)? {
            0 => break,
            _ => {
                if FORBIDDEN_BYTES.contains(&byte[0]) {
                    return Ok(false);
                }
            }
        }
        offset += RECORD_SIZE as u64;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn manifest_uses_column_underscore_row_keys() {
        let mut buttons = BTreeMap::new();
        buttons.insert(6, Button { name: Some("Six".into()), icon: None, command: None });
        let (manifest, icons) = build_manifest(&buttons);
        assert!(manifest.get("1_1").is_some());
        assert!(icons.is_empty());
    }

    #[test]
    fn manifest_collects_icon_names_with_prefix() {
        let mut buttons = BTreeMap::new();
        buttons.insert(0, Button { name: None, icon: Some("a.png".into()), command: None });
        let (manifest, icons) = build_manifest(&buttons);
        let entry = manifest.get("0_0").unwrap();
        let param = entry["ViewParam"][0].clone();
        assert_eq!(param["Icon"], "icons/a.png");
        assert_eq!(icons, vec!["a.png".to_string()]);
    }

    #[test]
    fn zip_and_scan_round_trip_on_clean_content() {
        let tmp = tempfile::tempdir().unwrap();
        let page = tmp.path().join("page");
        fs::create_dir_all(page.join("icons")).unwrap();
        fs::write(page.join("manifest.json"), b"{}").unwrap();

        let zip_path = tmp.path().join("out.zip");
        zip_folder(&page, &zip_path).unwrap();
        assert!(zip_path.exists());
        // Clean or not, the scan must not error on a well-formed archive.
        archive_is_clean(&zip_path).unwrap();
    }
}
