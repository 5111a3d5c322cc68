//! Dry-run 传输 - 只打印将要发送的内容

use super::{Endpoint, Outcome, Transport, NOTICES_PATH};
use crate::notice::Notice;

/// 不发起网络请求，把请求体写到 stderr
#[derive(Debug, Clone)]
pub struct DryRunTransport {
    endpoint: Endpoint,
}

impl DryRunTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Transport for DryRunTransport {
    fn send(&self, notice: &Notice) -> Outcome {
        eprintln!("[DRY-RUN] Would POST to {}", self.endpoint.url(NOTICES_PATH));
        match notice.to_yaml() {
            Ok(body) => eprintln!("{}", body),
            Err(e) => eprintln!("[DRY-RUN] Failed to serialize notice: {}", e),
        }

        Outcome::Success {
            status_description: "dry-run".to_string(),
        }
    }
}
