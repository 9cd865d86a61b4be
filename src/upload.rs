use anyhow::Context;
use std::fmt;
use std::path::Path;

use crate::model::{now_stamp, Role, UploadRecord};
use crate::store::Workspace;
use crate::visibility;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".csv", ".json", ".txt", ".xlsx"];

/// Acceptance rules for candidate files. The extension allow-list is
/// configuration, not law; the daemon runs with the defaults.
pub struct UploadPolicy {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> UploadPolicy {
        UploadPolicy {
            max_file_size: MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Caller-correctable rejection vs. a storage fault. The distinction maps
/// straight onto the IPC error codes.
#[derive(Debug)]
pub enum UploadError {
    Validation(String),
    Storage(anyhow::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Validation(msg) => write!(f, "validation failed: {}", msg),
            UploadError::Storage(e) => write!(f, "storage failed: {:#}", e),
        }
    }
}

impl std::error::Error for UploadError {}

/// Checks existence, size ceiling, and extension. Returns the observed
/// size so the caller does not have to stat twice.
pub fn validate_candidate(policy: &UploadPolicy, source: &Path) -> Result<u64, UploadError> {
    if !source.is_file() {
        return Err(UploadError::Validation(format!(
            "file does not exist: {}",
            source.to_string_lossy()
        )));
    }
    let size = std::fs::metadata(source)
        .map_err(|e| UploadError::Storage(anyhow::Error::new(e).context("stat candidate file")))?
        .len();
    if size > policy.max_file_size {
        return Err(UploadError::Validation(format!(
            "file size {} exceeds maximum allowed size {}",
            size, policy.max_file_size
        )));
    }
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !policy.allowed_extensions.iter().any(|ext| name.ends_with(ext)) {
        return Err(UploadError::Validation(format!(
            "file extension not allowed: {}",
            name
        )));
    }
    Ok(size)
}

/// Validate, copy the content into the role directory, then append one
/// metadata record and flush the store. The append is buffered: a failed
/// durable write leaves the in-memory store at its pre-call contents.
/// The visibility list is stored exactly as supplied.
pub fn upload_file(
    workspace: &mut Workspace,
    policy: &UploadPolicy,
    source: &Path,
    uploader_email: &str,
    uploader_role: &str,
    visible_to: Vec<String>,
) -> Result<UploadRecord, UploadError> {
    let size = validate_candidate(policy, source)?;

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| UploadError::Validation("candidate has no file name".into()))?;

    let role_dir = Role::upload_dir(uploader_role);
    let target = workspace.uploads_dir().join(role_dir).join(&file_name);
    // A name collision overwrites the earlier record's content in place.
    let target_preexisted = target.exists();
    std::fs::copy(source, &target)
        .with_context(|| format!("failed to copy into {}", target.to_string_lossy()))
        .map_err(UploadError::Storage)?;

    let record = UploadRecord {
        id: next_id(workspace.uploads.records()),
        file_name,
        uploaded_by: uploader_email.to_string(),
        role: uploader_role.trim().to_ascii_uppercase(),
        file_path: format!("uploads/{}/{}", role_dir, record_file_name(&target)),
        timestamp: now_stamp(),
        file_size: size as i64,
        visible_to,
    };

    if let Err(e) = workspace.uploads.append(record.clone()) {
        // The metadata write is what commits an upload; drop the orphaned
        // copy, but never a file an earlier record still points at.
        if !target_preexisted {
            let _ = std::fs::remove_file(&target);
        }
        return Err(UploadError::Storage(e));
    }
    Ok(record)
}

fn record_file_name(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `max(ids) + 1`, recomputed from the live record set on every call so a
/// hand-edited or gappy backing file can never desynchronize it.
pub fn next_id(records: &[UploadRecord]) -> i64 {
    records.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

/// The visible subset for one viewer, in store order (oldest first).
pub fn visible_records_for<'a>(
    records: &'a [UploadRecord],
    viewer_email: &str,
    viewer_role: &str,
) -> Vec<&'a UploadRecord> {
    records
        .iter()
        .filter(|r| visibility::can_view(r, viewer_email, viewer_role))
        .collect()
}

/// Reporting filter on the uploader's role tag; ignores visibility.
pub fn records_by_role<'a>(records: &'a [UploadRecord], role: &str) -> Vec<&'a UploadRecord> {
    records
        .iter()
        .filter(|r| r.role.eq_ignore_ascii_case(role.trim()))
        .collect()
}

/// Reporting filter on the uploader identity; ignores visibility.
pub fn records_by_uploader<'a>(records: &'a [UploadRecord], email: &str) -> Vec<&'a UploadRecord> {
    records
        .iter()
        .filter(|r| r.uploaded_by.eq_ignore_ascii_case(email))
        .collect()
}

/// Display orderings for reports. Unknown criteria fall back to id order.
pub fn sorted(records: &[UploadRecord], criteria: &str) -> Vec<UploadRecord> {
    let mut out = records.to_vec();
    match criteria.to_ascii_lowercase().as_str() {
        "name" | "filename" => out.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        "role" => out.sort_by(|a, b| a.role.cmp(&b.role)),
        "timestamp" | "date" => out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        _ => out.sort_by_key(|r| r.id),
    }
    out
}

/// Case-insensitive substring search over file name, uploader, and role.
pub fn find<'a>(records: &'a [UploadRecord], needle: &str) -> Vec<&'a UploadRecord> {
    let needle = needle.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.file_name.to_lowercase().contains(&needle)
                || r.uploaded_by.to_lowercase().contains(&needle)
                || r.role.to_lowercase().contains(&needle)
        })
        .collect()
}
