//! HTTP 连接 - 每次发送打开一个连接，发送后释放

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 连接目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub open_timeout: Duration,
    pub read_timeout: Duration,
    pub use_proxy: bool,
}

impl Endpoint {
    /// 服务根地址，如 `http://hoptoadapp.com:80`
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// 服务返回的原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// 状态描述，如 `200 OK`
    pub description: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 连接层错误
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("connection already closed")]
    Closed,
}

impl ConnectionError {
    /// 错误类别名（写入日志）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "Timeout",
            Self::Connect(_) => "ConnectError",
            Self::Request(_) => "RequestError",
            Self::Closed => "ConnectionClosed",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ConnectionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// 单次发送使用的连接
pub trait Connection {
    /// POST 请求体到指定路径
    fn post(
        &mut self,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ConnectionError>;

    /// 连接是否仍处于打开状态
    fn is_open(&self) -> bool;

    /// 关闭连接并释放底层 socket
    fn close(&mut self);
}

/// 连接工厂
pub trait Connector: Send + Sync {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, ConnectionError>;
}

/// 基于 reqwest blocking 客户端的连接工厂
#[derive(Debug, Clone, Default)]
pub struct ReqwestConnector;

impl Connector for ReqwestConnector {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, ConnectionError> {
        // 每个连接独立的 client，关闭时连同连接池一起释放
        let mut builder = reqwest::blocking::Client::builder()
            .connect_timeout(endpoint.open_timeout)
            .timeout(endpoint.read_timeout)
            .pool_max_idle_per_host(0);
        if !endpoint.use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ConnectionError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Box::new(ReqwestConnection {
            client: Some(client),
            base_url: endpoint.base_url(),
        }))
    }
}

/// reqwest 连接
pub struct ReqwestConnection {
    client: Option<reqwest::blocking::Client>,
    base_url: String,
}

impl Connection for ReqwestConnection {
    fn post(
        &mut self,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ConnectionError> {
        let client = self.client.as_ref().ok_or(ConnectionError::Closed)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = client.post(&url).body(body.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let start = std::time::Instant::now();
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            "POST completed"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            description: status.to_string(),
            body,
        })
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn close(&mut self) {
        self.client = None;
    }
}
