use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

use crate::config::ResolvedConfig;
use crate::store::Storage;
use crate::store::db::{Db, UploadOutcome};

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// `locdiff upload` — register screenshots for a (project, locale, build).
///
/// Each file's stem becomes the screen name. Re-uploading an existing screen
/// snapshots the previous state and bumps its revision.
pub fn upload(
    config: ResolvedConfig,
    project: &str,
    locale: &str,
    build: &str,
    patterns: &[String],
) -> Result<()> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matched =
            glob::glob(pattern).with_context(|| format!("Invalid glob pattern '{pattern}'"))?;
        for entry in matched {
            let path = entry.with_context(|| format!("Cannot read match for '{pattern}'"))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    if files.is_empty() {
        bail!("No files matched");
    }

    let storage = Storage::new(&config.storage_root);
    let mut db = Db::open(&config.db_path)?;

    let mut created = 0usize;
    let mut revised = 0usize;

    for path in &files {
        let screen = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;

        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        // Reject anything the diff engine could not decode later.
        image::load_from_memory(&bytes)
            .with_context(|| format!("{} is not a decodable raster image", path.display()))?;

        let hash = sha256_hex(&bytes);
        let rel = Storage::screen_rel(project, locale, build, &screen);
        storage.store_screen(&rel, &bytes)?;

        match db.record_screenshot(project, &screen, locale, build, &rel, &hash)? {
            UploadOutcome::Created(rec) => {
                created += 1;
                println!("  \x1b[32m NEW\x1b[0m  {screen}  (id {})", rec.id);
            }
            UploadOutcome::Revised(rec) => {
                revised += 1;
                println!(
                    "  \x1b[33m REV\x1b[0m  {screen}  (id {}, revision {})",
                    rec.id, rec.revision
                );
            }
        }
    }

    println!();
    println!(
        "Uploaded {} screenshot(s) ({created} new, {revised} revised)",
        files.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let h = sha256_hex(b"abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
