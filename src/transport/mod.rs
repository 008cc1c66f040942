use std::{future::Future, time::Duration};

use file::FileTransport;
use http::ReqwestTransport;
use reqwest::Certificate;
use url::Url;

use crate::flag::{FlagDocument, FlagUpdate, Health};

mod file;
mod http;

pub use file::FileTransportError;
pub use http::ReqwestTransportError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

pub(crate) trait Transport: Send + Sync + Clone + 'static {
    type Error: std::error::Error + Send;

    fn fetch_flags(&self) -> impl Future<Output = Result<FlagDocument, Self::Error>> + Send;

    fn write_flag(
        &mut self,
        update: FlagUpdate,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn health(&self) -> impl Future<Output = Result<Health, Self::Error>> + Send;
}

#[derive(Clone)]
pub(crate) enum Transports {
    File(FileTransport),
    Http(ReqwestTransport),
}

impl Transports {
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(err(level = tracing::Level::TRACE)))]
    pub(crate) async fn try_new(
        opt_value: Option<String>,
        flag_key: String,
        timeout: Duration,
        certificates: Option<Certificate>,
        proxy: Option<Url>,
    ) -> Result<Self, TransportsError> {
        let value = opt_value.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let url = match Url::parse(&value) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                tracing::debug!("Treating the endpoint as a local file path");
                let path = std::path::absolute(&value)
                    .map_err(|e| TransportsError::ResolvePath(value.clone().into(), e))?;
                Url::from_file_path(&path).map_err(|()| TransportsError::NotAFilePath(value))?
            }
            Err(e) => return Err(e.into()),
        };

        match url.scheme() {
            "https" | "http" => Ok(Transports::Http(ReqwestTransport::new(
                url,
                timeout,
                certificates,
                proxy,
            )?)),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| TransportsError::NotAFilePath(url.to_string()))?;

                Ok(Transports::File(FileTransport::new(path, flag_key).await?))
            }
            _ => Err(TransportsError::UnknownUrlScheme),
        }
    }
}

impl Transport for Transports {
    type Error = TransportsError;

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn fetch_flags(&self) -> Result<FlagDocument, Self::Error> {
        match self {
            Self::File(t) => Ok(t.fetch_flags().await?),
            Self::Http(t) => Ok(t.fetch_flags().await?),
        }
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn write_flag(&mut self, update: FlagUpdate) -> Result<(), Self::Error> {
        match self {
            Self::File(t) => Ok(t.write_flag(update).await?),
            Self::Http(t) => Ok(t.write_flag(update).await?),
        }
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn health(&self) -> Result<Health, Self::Error> {
        match self {
            Self::File(t) => Ok(t.health().await?),
            Self::Http(t) => Ok(t.health().await?),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportsError {
    #[error(transparent)]
    FileError(#[from] file::FileTransportError),

    #[error(transparent)]
    HttpError(#[from] http::ReqwestTransportError),

    #[error("Only http, https, and file URL schemes are supported.")]
    UnknownUrlScheme,

    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("Cannot resolve the flag file path `{0}`")]
    ResolvePath(std::path::PathBuf, #[source] std::io::Error),

    #[error("`{0}` does not name a local flag file")]
    NotAFilePath(String),

    #[error("Read path `{0}`")]
    Read(std::path::PathBuf, #[source] std::io::Error),

    #[error("Unknown certificate format, `der` and `pem` supported")]
    UnknownCertFormat,
}
