use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::store::DATA_FILES;

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "lms-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub restored_files: usize,
}

/// Bundle every data file the workspace currently has into one zip. Files
/// that were never created (empty collections) are simply absent from the
/// bundle. The manifest records a SHA-256 per entry so a restore can be
/// checked offline.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut checksums = serde_json::Map::new();
    let mut entry_count = 0usize;
    for name in DATA_FILES {
        let src = workspace_path.join(name);
        if !src.is_file() {
            continue;
        }
        let bytes = std::fs::read(&src)
            .with_context(|| format!("failed to read {}", src.to_string_lossy()))?;
        let digest = Sha256::digest(&bytes);
        checksums.insert(name.to_string(), json!(format!("{:x}", digest)));

        zip.start_file(format!("data/{}", name), opts)
            .with_context(|| format!("failed to start entry data/{}", name))?;
        zip.write_all(&bytes)
            .with_context(|| format!("failed to write entry data/{}", name))?;
        entry_count += 1;
    }

    if entry_count == 0 {
        return Err(anyhow!(
            "no data files found in workspace {}",
            workspace_path.to_string_lossy()
        ));
    }

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "sha256": checksums,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entry_count + 1,
    })
}

/// Restore a bundle into a workspace directory. Each data file is extracted
/// next to its final name and renamed into place, so a half-finished import
/// never clobbers an existing file with a truncated one.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut restored = 0usize;
    for name in DATA_FILES {
        let entry_name = format!("data/{}", name);
        let mut bytes = Vec::new();
        match archive.by_name(&entry_name) {
            Ok(mut entry) => {
                entry
                    .read_to_end(&mut bytes)
                    .with_context(|| format!("failed to read entry {}", entry_name))?;
            }
            Err(_) => continue,
        }

        if let Some(expected) = manifest
            .get("sha256")
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
        {
            let actual = format!("{:x}", Sha256::digest(&bytes));
            if actual != expected {
                return Err(anyhow!("checksum mismatch for bundle entry {}", entry_name));
            }
        }

        let dst = workspace_path.join(name);
        let tmp = workspace_path.join(format!("{}.importing", name));
        std::fs::write(&tmp, &bytes)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &dst).with_context(|| {
            format!("failed to move restored file to {}", dst.to_string_lossy())
        })?;
        restored += 1;
    }

    if restored == 0 {
        return Err(anyhow!("bundle contains no data entries"));
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        restored_files: restored,
    })
}
