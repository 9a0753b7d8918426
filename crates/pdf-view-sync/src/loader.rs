use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// The document-rendering collaborator. The viewer never looks at document bytes itself.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load_document(&self, path: &Path) -> Result<(), LoadError>;
}

/// Accepts every document without touching the file
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptingLoader;

#[async_trait]
impl DocumentLoader for AcceptingLoader {
    async fn load_document(&self, path: &Path) -> Result<(), LoadError> {
        log::debug!("Accepting {} without rendering", path.display());
        Ok(())
    }
}
