use std::time::Duration;

use reqwest::Certificate;
use url::Url;

use crate::flag::DEFAULT_FLAG_KEY;
use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::transport::{Transport, TransportsError};
use crate::{FlagHandle, Worker};

#[derive(Default)]
pub struct Builder {
    endpoint: Option<String>,
    flag_key: Option<String>,
    poll_interval: Option<Duration>,
    proxy: Option<Url>,
    certificate: Option<Certificate>,
    timeout: Option<Duration>,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            endpoint: None,
            flag_key: None,
            poll_interval: None,
            proxy: None,
            certificate: None,
            timeout: None,
        }
    }

    /// Base URL of the flag service, or a path to a local flag document.
    ///
    /// Defaults to `http://localhost:8080`.
    pub fn set_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn set_flag_key(mut self, flag_key: Option<String>) -> Self {
        self.flag_key = flag_key;
        self
    }

    pub fn set_poll_interval(mut self, poll_interval: Option<Duration>) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn set_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Set the certificate from a path.
    ///
    /// Certificate paths that are invalid or can't be parsed are ignored with a tracing warning.
    ///
    /// This function will only set the certificate bundle if the certificates are parsed successfully.
    ///
    /// If you would like more strict checking of the certificates, use `set_certificate` directly.
    pub async fn set_certificate_from_path(
        self,
        certificate_path: Option<std::path::PathBuf>,
    ) -> Self {
        let Some(path) = certificate_path else {
            return self;
        };

        let Ok(certs) = read_cert_file(&path).await.inspect_err(|e| {
            tracing::warn!(?path, %e, "Failed to parse the TLS certificates");
        }) else {
            return self;
        };

        self.set_certificate(Some(certs))
    }

    pub fn set_certificate(mut self, certificate: Option<Certificate>) -> Self {
        self.certificate = certificate;
        self
    }

    pub fn set_proxy(mut self, proxy: Option<Url>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Connect to the flag service and start polling.
    ///
    /// ```rust
    /// use flagwatch::Builder;
    ///
    /// # tokio_test::block_on(async {
    /// let (handle, worker) = Builder::new()
    ///   .set_endpoint(Some("http://localhost:8080".into()))
    ///   .set_poll_interval(Some(std::time::Duration::from_secs(5)))
    ///   .build()
    ///   .await
    ///   .unwrap();
    ///
    /// drop(handle);
    /// worker.wait().await;
    /// # })
    /// ```
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self)))]
    pub async fn build(mut self) -> Result<(FlagHandle, Worker), TransportsError> {
        let transport = crate::transport::Transports::try_new(
            self.endpoint.take(),
            self.flag_key(),
            self.timeout
                .take()
                .unwrap_or_else(|| Duration::from_secs(3)),
            self.certificate.take(),
            self.proxy.take(),
        )
        .await?;

        Ok(self.build_with(transport))
    }

    pub(crate) fn build_with<T: Transport>(self, transport: T) -> (FlagHandle, Worker) {
        let flag_key = self.flag_key();

        let poll_interval = match self.poll_interval {
            Some(interval) if interval.is_zero() => {
                tracing::warn!(
                    default = ?DEFAULT_POLL_INTERVAL,
                    "A zero poll interval is not allowed, using the default"
                );
                DEFAULT_POLL_INTERVAL
            }
            Some(interval) => interval,
            None => DEFAULT_POLL_INTERVAL,
        };

        Worker::new(transport, flag_key, poll_interval)
    }

    fn flag_key(&self) -> String {
        self.flag_key
            .clone()
            .unwrap_or_else(|| DEFAULT_FLAG_KEY.to_string())
    }
}

#[cfg_attr(feature = "tracing-instrument", tracing::instrument(ret(level = tracing::Level::TRACE)))]
async fn read_cert_file(
    ssl_cert_file: impl AsRef<std::path::Path> + std::fmt::Debug,
) -> Result<Certificate, TransportsError> {
    let cert_buf = tokio::fs::read(&ssl_cert_file)
        .await
        .map_err(|e| TransportsError::Read(ssl_cert_file.as_ref().to_path_buf(), e))?;

    if let Ok(cert) = Certificate::from_pem(cert_buf.as_slice()) {
        return Ok(cert);
    }

    if let Ok(cert) = Certificate::from_der(cert_buf.as_slice()) {
        return Ok(cert);
    }

    Err(TransportsError::UnknownCertFormat)
}
