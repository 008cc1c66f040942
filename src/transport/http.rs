use reqwest::{Certificate, StatusCode};
use url::Url;

use crate::flag::{FlagDocument, FlagUpdate, Health};

use super::Transport;

#[derive(Clone)]
pub(crate) struct ReqwestTransport {
    host: Url,
    timeout: std::time::Duration,
    client: reqwest::Client,
}
impl ReqwestTransport {
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(err))]
    pub(crate) fn new(
        host: Url,
        timeout: std::time::Duration,
        certificates: Option<Certificate>,
        proxy: Option<Url>,
    ) -> Result<Self, ReqwestTransportError> {
        let mut builder = reqwest::ClientBuilder::new();

        if let Some(cert) = certificates {
            builder = builder.add_root_certificate(cert);
        }

        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.clone())?);
        }

        Ok(ReqwestTransport {
            host,
            client: builder.build()?,
            timeout,
        })
    }

    /// Appends `path` to whatever path the endpoint already carries.
    fn url(&self, path: &str) -> Url {
        let mut url = self.host.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{path}"));
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ReqwestTransportError> {
        let url = self.url(path);

        let resp = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .inspect_err(|e| tracing::debug!(%e, "Failed to reach `{url}`"))?;

        if !resp.status().is_success() {
            return Err(ReqwestTransportError::Status(resp.status()));
        }

        Ok(resp.json().await?)
    }
}

impl Transport for ReqwestTransport {
    type Error = ReqwestTransportError;

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn fetch_flags(&self) -> Result<FlagDocument, Self::Error> {
        self.get_json("/api/flags").await
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn write_flag(&mut self, update: FlagUpdate) -> Result<(), Self::Error> {
        let resp = self
            .client
            .post(self.url("/api/flags"))
            .timeout(self.timeout)
            .json(&update)
            .send()
            .await?;

        if resp.status().is_success() {
            let body = resp.text().await.ok();
            tracing::trace!(?body, "Flag update acknowledged");
            return Ok(());
        }

        Err(Self::Error::Status(resp.status()))
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip_all, ret(level = tracing::Level::TRACE)))]
    async fn health(&self) -> Result<Health, Self::Error> {
        self.get_json("/api/health").await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReqwestTransportError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("The flag service answered with {0}")]
    Status(StatusCode),
}
