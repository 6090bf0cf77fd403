// src/db/blob_store.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;

/// Armazenamento de arquivos (documentos enviados e contratos gerados).
/// Os caminhos devolvidos são relativos: `<id>/<nome>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, owner: Uuid, name: &str, bytes: Vec<u8>) -> Result<String, AppError>;

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, AppError>;
}

/// Blob store em disco, sob `UPLOAD_DIR`.
#[derive(Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Só aceita caminhos relativos simples, sem `..`
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, owner: Uuid, name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let relative = format!("{owner}/{name}");
        let target = self
            .resolve(&relative)
            .ok_or_else(|| AppError::validation("file", "Nome de arquivo inválido"))?;

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!("Arquivo gravado em {}", target.display());
        Ok(relative)
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, AppError> {
        let Some(target) = self.resolve(path) else {
            return Ok(None);
        };

        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
