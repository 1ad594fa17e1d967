//! 远程图标下载：基于 reqwest 的 HTTP 获取，带超时。

use std::future::Future;
use std::time::Duration;

use crate::icon::IconError;

/// 单次下载的超时时间，避免网络挂起阻塞整条流水线。
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// 远程获取能力，测试中可替换为本地实现。
pub trait IconFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, IconError>>;
}

/// 默认的 HTTP 实现。
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, IconError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| IconError::Fetch(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl IconFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IconError> {
        tracing::info!("downloading icon from {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IconError::Fetch(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(IconError::Fetch(format!(
                "{url}: request failed with {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| IconError::Fetch(format!("{url}: {e}")))?;
        tracing::debug!("downloaded icon bytes={}", bytes.len());
        Ok(bytes.to_vec())
    }
}
