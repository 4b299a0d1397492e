use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use blog_client::types::ExportedFile;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::info;

/// Write `file` into `directory`, picking `name (n).ext` when the server's
/// suggested name is already taken. Existing files are never replaced.
pub async fn write_export(directory: &Path, file: &ExportedFile) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .await
        .with_context(|| format!("failed to create {}", directory.display()))?;

    let (stem, extension) = match file.file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (file.file_name.as_str(), None),
    };

    let mut index = 0_u32;
    let (path, mut handle) = loop {
        let name = match (index, extension) {
            (0, _) => file.file_name.clone(),
            (_, Some(extension)) => format!("{stem} ({index}).{extension}"),
            (_, None) => format!("{stem} ({index})"),
        };
        let candidate = directory.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(handle) => break (candidate, handle),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                index = index
                    .checked_add(1)
                    .context("no free file name left for the export")?;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create {}", candidate.display()));
            }
        }
    };

    handle
        .write_all(&file.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    handle
        .flush()
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(
        target: "blog_core",
        path = %path.display(),
        bytes = file.bytes.len(),
        "export written"
    );
    Ok(path)
}
