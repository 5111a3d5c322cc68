//! 传输层 - 序列化 Notice 并 POST 到错误追踪服务
//!
//! 每次发送都是一次同步 HTTP 调用，不重试、不排队。
//! 所有连接层错误都在这里转换为 [`Outcome`]，不会向调用方传播。

pub mod connection;
pub mod dry_run;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::notice::Notice;

pub use connection::{
    Connection, ConnectionError, Connector, Endpoint, HttpResponse, ReqwestConnector,
};
pub use dry_run::DryRunTransport;

/// 通知提交路径
pub const NOTICES_PATH: &str = "/notices/";

/// 请求体格式
pub const CONTENT_TYPE: &str = "application/x-yaml";

/// 可接受的响应格式
pub const ACCEPT: &str = "text/xml, application/xml";

/// 固定请求头
pub const HEADERS: [(&str, &str); 2] = [("Content-type", CONTENT_TYPE), ("Accept", ACCEPT)];

/// 一次发送的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 2XX 响应
    Success { status_description: String },
    /// 非 2XX 响应
    Failure {
        status_description: String,
        body: String,
    },
    /// 连接 / 超时等传输层错误
    TransportError {
        exception_description: String,
        timeout: bool,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn from_response(response: HttpResponse) -> Self {
        if response.is_success() {
            Self::Success {
                status_description: response.description,
            }
        } else {
            Self::Failure {
                status_description: response.description,
                body: response.body,
            }
        }
    }

    fn from_error(error: &ConnectionError) -> Self {
        Self::TransportError {
            exception_description: error.kind().to_string(),
            timeout: error.is_timeout(),
        }
    }
}

/// 发送 Notice 的能力
pub trait Transport: Send + Sync {
    fn send(&self, notice: &Notice) -> Outcome;
}

impl From<&TransportConfig> for Endpoint {
    fn from(config: &TransportConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            secure: config.secure,
            open_timeout: Duration::from_millis(config.open_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            use_proxy: config.use_proxy,
        }
    }
}

/// HTTP 传输
pub struct HttpTransport {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
}

impl HttpTransport {
    /// 使用 reqwest 连接
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_connector(endpoint, Arc::new(ReqwestConnector))
    }

    pub fn with_connector(endpoint: Endpoint, connector: Arc<dyn Connector>) -> Self {
        Self {
            endpoint,
            connector,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// POST 已序列化的请求体并分类结果
    ///
    /// 连接在所有退出路径上都会被关闭。
    pub fn post(&self, body: &str) -> Outcome {
        let mut connection = match self.connector.open(&self.endpoint) {
            Ok(connection) => connection,
            Err(e) => {
                debug!(host = %self.endpoint.host, error = %e, "Failed to open connection");
                return Outcome::from_error(&e);
            }
        };

        let outcome = match connection.post(NOTICES_PATH, body, &HEADERS) {
            Ok(response) => Outcome::from_response(response),
            Err(e) => {
                debug!(
                    host = %self.endpoint.host,
                    error = %e,
                    connection_open = connection.is_open(),
                    "POST to service failed"
                );
                Outcome::from_error(&e)
            }
        };

        if connection.is_open() {
            connection.close();
        }

        outcome
    }
}

impl Transport for HttpTransport {
    fn send(&self, notice: &Notice) -> Outcome {
        let body = match notice.to_yaml() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to serialize notice");
                return Outcome::TransportError {
                    exception_description: "SerializationError".to_string(),
                    timeout: false,
                };
            }
        };

        self.post(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 测试用的 mock 连接，记录请求并返回预设结果
    struct MockConnection {
        state: Arc<MockState>,
        reply: Option<Result<HttpResponse, ConnectionError>>,
        open: bool,
    }

    #[derive(Default)]
    struct MockState {
        opened: AtomicUsize,
        closed: AtomicUsize,
        report_closed_on_error: AtomicBool,
        requests: Mutex<Vec<(String, String, Vec<(String, String)>)>>,
    }

    impl Connection for MockConnection {
        fn post(
            &mut self,
            path: &str,
            body: &str,
            headers: &[(&str, &str)],
        ) -> Result<HttpResponse, ConnectionError> {
            self.state.requests.lock().unwrap().push((
                path.to_string(),
                body.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            let reply = self.reply.take().unwrap_or(Err(ConnectionError::Closed));
            if reply.is_err() && self.state.report_closed_on_error.load(Ordering::SeqCst) {
                self.open = false;
            }
            reply
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn close(&mut self) {
            self.open = false;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockConnector {
        state: Arc<MockState>,
        reply: Mutex<Option<Result<HttpResponse, ConnectionError>>>,
        refuse: bool,
    }

    impl MockConnector {
        fn replying(reply: Result<HttpResponse, ConnectionError>) -> Self {
            Self {
                state: Arc::new(MockState::default()),
                reply: Mutex::new(Some(reply)),
                refuse: false,
            }
        }

        fn refusing() -> Self {
            Self {
                state: Arc::new(MockState::default()),
                reply: Mutex::new(None),
                refuse: true,
            }
        }
    }

    impl Connector for MockConnector {
        fn open(&self, _endpoint: &Endpoint) -> Result<Box<dyn Connection>, ConnectionError> {
            if self.refuse {
                return Err(ConnectionError::Connect("connection refused".to_string()));
            }
            self.state.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockConnection {
                state: self.state.clone(),
                reply: self.reply.lock().unwrap().take(),
                open: true,
            }))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::from(&TransportConfig::default())
    }

    fn response(status: u16, description: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            description: description.to_string(),
            body: body.to_string(),
        }
    }

    fn transport(connector: &Arc<MockConnector>) -> HttpTransport {
        HttpTransport::with_connector(endpoint(), connector.clone())
    }

    #[test]
    fn test_posts_yaml_to_notices_path_with_fixed_headers() {
        let connector = Arc::new(MockConnector::replying(Ok(response(200, "200 OK", ""))));
        let notice = Notice::defaults(Some("KEY".to_string()));

        transport(&connector).send(&notice);

        let requests = connector.state.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (path, body, headers) = &requests[0];
        assert_eq!(path, "/notices/");
        assert_eq!(body, &notice.to_yaml().unwrap());
        assert_eq!(
            headers,
            &vec![
                ("Content-type".to_string(), "application/x-yaml".to_string()),
                ("Accept".to_string(), "text/xml, application/xml".to_string()),
            ]
        );
    }

    #[test]
    fn test_2xx_is_success() {
        let connector = Arc::new(MockConnector::replying(Ok(response(201, "201 Created", "ok"))));
        let outcome = transport(&connector).send(&Notice::defaults(None));

        assert_eq!(
            outcome,
            Outcome::Success {
                status_description: "201 Created".to_string()
            }
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_non_2xx_is_failure_with_body() {
        let connector = Arc::new(MockConnector::replying(Ok(response(
            500,
            "500 Internal Server Error",
            "Upstream unavailable",
        ))));
        let outcome = transport(&connector).send(&Notice::defaults(None));

        assert_eq!(
            outcome,
            Outcome::Failure {
                status_description: "500 Internal Server Error".to_string(),
                body: "Upstream unavailable".to_string(),
            }
        );
    }

    #[test]
    fn test_timeout_is_transport_error_and_closes_open_connection() {
        let connector = Arc::new(MockConnector::replying(Err(ConnectionError::Timeout(
            "It took too long".to_string(),
        ))));
        let outcome = transport(&connector).send(&Notice::defaults(None));

        assert_eq!(
            outcome,
            Outcome::TransportError {
                exception_description: "Timeout".to_string(),
                timeout: true,
            }
        );
        assert_eq!(connector.state.opened.load(Ordering::SeqCst), 1);
        assert_eq!(connector.state.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_already_closed_connection_is_not_closed_again() {
        let connector = Arc::new(MockConnector::replying(Err(ConnectionError::Connect(
            "reset".to_string(),
        ))));
        connector
            .state
            .report_closed_on_error
            .store(true, Ordering::SeqCst);

        let outcome = transport(&connector).send(&Notice::defaults(None));

        assert!(matches!(
            outcome,
            Outcome::TransportError { timeout: false, .. }
        ));
        assert_eq!(connector.state.closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_connection_released_after_success() {
        let connector = Arc::new(MockConnector::replying(Ok(response(200, "200 OK", ""))));
        transport(&connector).send(&Notice::defaults(None));
        assert_eq!(connector.state.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refused_connection_is_transport_error() {
        let connector = Arc::new(MockConnector::refusing());
        let outcome = transport(&connector).send(&Notice::defaults(None));

        assert_eq!(
            outcome,
            Outcome::TransportError {
                exception_description: "ConnectError".to_string(),
                timeout: false,
            }
        );
        assert_eq!(connector.state.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_endpoint_from_config() {
        let endpoint = endpoint();
        assert_eq!(endpoint.host, "hoptoadapp.com");
        assert_eq!(endpoint.port, 80);
        assert_eq!(endpoint.open_timeout, Duration::from_secs(2));
        assert_eq!(endpoint.read_timeout, Duration::from_secs(5));
    }
}
