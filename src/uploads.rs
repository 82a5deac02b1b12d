//! Upload folder management.
//!
//! Validation is all-or-nothing: a batch that violates any rule (file
//! count, extension, aggregate size) is rejected before a single byte is
//! written. Only the `.pdf` extension is checked — no content sniffing.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pdf::is_pdf_filename;

/// An uploaded file as listed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: String,
}

/// One file in an incoming upload batch.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Path components are stripped so an upload can never escape the folder.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim().to_string())
        .unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::InvalidUpload(format!("Invalid filename: '{}'.", name)));
    }
    Ok(base)
}

/// Validate a whole batch against the upload rules. Any violation rejects
/// the entire batch — nothing is saved.
pub fn validate_batch(files: &[IncomingFile], max_files: usize, max_bytes: usize) -> Result<()> {
    if files.is_empty() {
        return Err(Error::InvalidUpload(
            "No valid PDF files were uploaded.".to_string(),
        ));
    }
    if files.len() > max_files {
        return Err(Error::InvalidUpload(format!(
            "You can only upload a maximum of {} PDF files.",
            max_files
        )));
    }

    let mut total = 0usize;
    for file in files {
        if !is_pdf_filename(&file.filename) {
            return Err(Error::InvalidUpload(format!(
                "Invalid file type for: {}. Only PDF files are allowed.",
                file.filename
            )));
        }
        total += file.bytes.len();
    }
    if total > max_bytes {
        return Err(Error::InvalidUpload(format!(
            "Upload exceeds the {} MB limit.",
            max_bytes / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Save a validated batch into the upload folder, overwriting files with
/// the same name. Returns the saved filenames.
pub fn save_batch(dir: &Path, files: &[IncomingFile]) -> Result<Vec<String>> {
    std::fs::create_dir_all(dir)?;

    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        let name = sanitize_filename(&file.filename)?;
        std::fs::write(dir.join(&name), &file.bytes)?;
        saved.push(name);
    }
    Ok(saved)
}

/// Remove one document from the upload folder.
pub fn remove_document(dir: &Path, filename: &str) -> Result<()> {
    let name = sanitize_filename(filename)?;
    let path = dir.join(&name);
    if !path.exists() {
        return Err(Error::DocumentNotFound(name));
    }
    std::fs::remove_file(path)?;
    Ok(())
}

/// List the PDFs currently in the upload folder with human-readable sizes.
pub fn list_documents(dir: &Path) -> Result<Vec<UploadedFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.file_type()?.is_file() || !is_pdf_filename(&name) {
            continue;
        }
        let size = entry.metadata()?.len();
        files.push(UploadedFile {
            filename: name,
            size: human_size(size),
        });
    }
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

/// Every `.pdf` path in the folder, sorted for deterministic ingestion order.
pub fn pdf_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_pdf_filename(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    Ok(paths)
}

fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(name: &str, len: usize) -> IncomingFile {
        IncomingFile {
            filename: name.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn batch_over_file_limit_rejected_entirely() {
        let tmp = tempfile::tempdir().unwrap();
        let files: Vec<IncomingFile> = (0..21).map(|i| incoming(&format!("f{}.pdf", i), 10)).collect();

        let err = validate_batch(&files, 20, 10 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidUpload(_)));

        // Nothing was saved.
        assert!(list_documents(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn exactly_twenty_files_accepted() {
        let files: Vec<IncomingFile> = (0..20).map(|i| incoming(&format!("f{}.pdf", i), 10)).collect();
        assert!(validate_batch(&files, 20, 10 * 1024 * 1024).is_ok());
    }

    #[test]
    fn non_pdf_in_batch_rejects_whole_batch() {
        let files = vec![incoming("a.pdf", 10), incoming("b.txt", 10)];
        let err = validate_batch(&files, 20, 10 * 1024 * 1024).unwrap_err();
        assert!(err.to_string().contains("b.txt"));
    }

    #[test]
    fn aggregate_size_limit_enforced() {
        let files = vec![incoming("a.pdf", 6 * 1024 * 1024), incoming("b.pdf", 5 * 1024 * 1024)];
        let err = validate_batch(&files, 20, 10 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidUpload(_)));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf").unwrap(), "passwd.pdf");
        assert_eq!(sanitize_filename("dir/report.pdf").unwrap(), "report.pdf");
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("").is_err());
    }

    #[test]
    fn remove_missing_document_reports_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = remove_document(tmp.path(), "ghost.pdf").unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn remove_existing_document_deletes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let saved = save_batch(tmp.path(), &[incoming("a.pdf", 4)]).unwrap();
        assert_eq!(saved, vec!["a.pdf"]);

        remove_document(tmp.path(), "a.pdf").unwrap();
        assert!(list_documents(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn listing_skips_non_pdfs_and_formats_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), vec![0u8; 512]).unwrap();
        std::fs::write(tmp.path().join("b.PDF"), vec![0u8; 2048]).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let files = list_documents(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "a.pdf");
        assert_eq!(files[0].size, "512 B");
        assert_eq!(files[1].size, "2.0 KB");
    }

    #[test]
    fn pdf_paths_sorted_and_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("skip.docx"), b"x").unwrap();

        let paths = pdf_paths(tmp.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }
}
