use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::flag::{FlagDocument, FlagUpdate, Health};

use super::Transport;

/// Serves the flag out of a local JSON document shaped like `GET /api/flags`.
#[derive(Clone)]
pub(crate) struct FileTransport {
    path: PathBuf,
    flag_key: String,
    write_lock: Arc<Mutex<()>>,
}

impl FileTransport {
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(err))]
    pub(crate) async fn new(
        path: impl Into<PathBuf> + std::fmt::Debug,
        flag_key: String,
    ) -> Result<Self, FileTransportError> {
        let path = path.into();

        tokio::fs::metadata(&path)
            .await
            .map_err(|e| FileTransportError::FileOpen(path.clone(), e))?;

        Ok(FileTransport {
            path,
            flag_key,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn read_document(&self) -> Result<FlagDocument, FileTransportError> {
        let buffer = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FileTransportError::Read(self.path.clone(), e))?;

        Ok(serde_json::from_slice(&buffer)?)
    }
}

impl Transport for FileTransport {
    type Error = FileTransportError;

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn fetch_flags(&self) -> Result<FlagDocument, Self::Error> {
        self.read_document().await
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn write_flag(&mut self, update: FlagUpdate) -> Result<(), Self::Error> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?;
        document.set(self.flag_key.clone(), update.state);

        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&document)?)
            .await
            .map_err(|e| FileTransportError::Write(self.path.clone(), e))?;

        Ok(())
    }

    async fn health(&self) -> Result<Health, Self::Error> {
        self.read_document().await?;
        Ok(Health::ok())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FileTransportError {
    #[error("Failure opening the flag file '{0}': {1}")]
    FileOpen(PathBuf, std::io::Error),

    #[error("Failure writing the flag file '{0}': {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failure reading the flag file '{0}': {1}")]
    Read(PathBuf, std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
