//! Writing finished batches to disk.
//!
//! [`downloads`] assigns every rendition (and optionally every untouched
//! original) its download name, numbering repeats so nothing in one batch is
//! written over. [`write_downloads`] puts them into the output directory.

use crate::naming::{original_file_name, rendition_file_name, unique_file_name};
use crate::registry::{ImageJob, JobId};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// One file of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download<'a> {
    pub job: JobId,
    /// Encoded width, or `None` for the untouched original.
    pub width: Option<u32>,
    pub file_name: String,
    pub bytes: &'a [u8],
}

/// Name every output of `jobs`, in job order, original first.
///
/// Originals are listed only for jobs with at least one rendition.
pub fn downloads<'a>(jobs: &'a [ImageJob], suffix: &str, include_originals: bool) -> Vec<Download<'a>> {
    let mut taken = HashSet::new();
    let mut out = Vec::new();
    let mut push = |job: JobId, width: Option<u32>, name: String, bytes: &'a [u8]| {
        let file_name = unique_file_name(&name, &taken);
        taken.insert(file_name.to_lowercase());
        out.push(Download {
            job,
            width,
            file_name,
            bytes,
        });
    };

    for job in jobs.iter().filter(|j| !j.renditions.is_empty()) {
        let name = job.source.name();
        if include_originals {
            push(job.id, None, original_file_name(name, suffix), job.source.bytes());
        }
        for r in &job.renditions {
            push(
                job.id,
                Some(r.width),
                rendition_file_name(name, r.width, r.mime_type(), suffix),
                &r.bytes,
            );
        }
    }
    out
}

/// Write every download into `dir`, creating it first.
pub fn write_downloads(dir: &Path, downloads: &[Download<'_>]) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    downloads
        .iter()
        .map(|d| {
            let path = dir.join(&d.file_name);
            std::fs::write(&path, d.bytes)?;
            tracing::debug!(path = %path.display(), bytes = d.bytes.len(), "wrote download");
            Ok(path)
        })
        .collect()
}
