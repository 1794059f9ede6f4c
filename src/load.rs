use std::path::{Path, PathBuf};

use anyhow::Context;
use ragline_memory::document::{Document, DocumentLoader, TextLoader};

pub(crate) fn default_loaders() -> Vec<Box<dyn DocumentLoader>> {
    #[cfg_attr(not(feature = "pdf"), allow(unused_mut))]
    let mut loaders: Vec<Box<dyn DocumentLoader>> = vec![Box::new(TextLoader::default())];
    #[cfg(feature = "pdf")]
    loaders.push(Box::new(ragline_memory::document::PdfLoader::default()));
    loaders
}

/// Files directly inside `dir` that some loader accepts, sorted by path.
pub(crate) async fn supported_files(
    dir: &Path,
    loaders: &[Box<dyn DocumentLoader>],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read document folder {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if loaders.iter().any(|l| l.supports(&path)) {
            files.push(path);
        } else {
            tracing::warn!("{}", skip_reason(&path));
        }
    }
    files.sort();
    Ok(files)
}

fn skip_reason(path: &Path) -> String {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf && cfg!(not(feature = "pdf")) {
        format!(
            "skipping {}: PDF support needs a build with the `pdf` feature",
            path.display()
        )
    } else {
        format!("skipping unsupported file {}", path.display())
    }
}

/// Load every supported document in `dir`. A file that fails to load aborts the run.
pub(crate) async fn load_folder(
    dir: &Path,
    loaders: &[Box<dyn DocumentLoader>],
) -> anyhow::Result<Vec<Document>> {
    let files = supported_files(dir, loaders).await?;
    let mut documents = Vec::new();
    for path in &files {
        let Some(loader) = loaders.iter().find(|l| l.supports(path)) else {
            continue;
        };
        tracing::info!("reading {}", path.display());
        let docs = loader
            .load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;
        documents.extend(docs);
    }
    tracing::info!("loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_supported_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.md"), "first").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let docs = load_folder(dir.path(), &default_loaders()).await.unwrap();
        let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(docs[0].metadata.content_type, "text/markdown");
    }

    #[test]
    fn skipped_pdf_names_the_feature() {
        let reason = skip_reason(Path::new("docs/manual.PDF"));
        if cfg!(feature = "pdf") {
            assert!(reason.starts_with("skipping unsupported file"));
        } else {
            assert!(reason.contains("`pdf` feature"), "{reason}");
        }
        assert!(skip_reason(Path::new("image.png")).starts_with("skipping unsupported file"));
    }

    #[tokio::test]
    async fn empty_folder_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_folder(dir.path(), &default_loaders()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_folder(&dir.path().join("absent"), &default_loaders()).await;
        assert!(result.is_err());
    }
}
