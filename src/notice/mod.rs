//! Notice 构建 - 发送到错误追踪服务的数据结构
//!
//! 线上格式（YAML）：
//! ```yaml
//! notice:
//!   api_key: UBERSECRET
//!   error_class: RuntimeError
//!   error_message: RuntimeError
//!   backtrace: ~
//!   request:
//!     params:
//!       q: "0017000000SmnJ0"
//!   session: {}
//!   environment: {}
//! ```
//!
//! 所有字段总是输出，缺失的值使用默认值（`~` 或空 mapping）。

pub mod filter;
pub mod request;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use filter::{NoticeFilter, FILTERED};
pub use request::{ExceptionInfo, RequestContext, SessionData, SimpleRequest};

/// 通知中的 mapping 字段类型（key 有序，输出稳定）
pub type Fields = serde_json::Map<String, Value>;

/// 默认 error_message
pub const DEFAULT_ERROR_MESSAGE: &str = "Notification";

/// 一条错误通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub api_key: Option<String>,
    pub error_class: Option<String>,
    pub error_message: String,
    pub backtrace: Option<Vec<String>>,
    pub request: Fields,
    pub session: Fields,
    pub environment: Fields,
}

#[derive(Serialize)]
struct Envelope<'a> {
    notice: &'a Notice,
}

impl Notice {
    /// 默认字段集合
    pub fn defaults(api_key: Option<String>) -> Self {
        Self {
            api_key,
            error_class: None,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            backtrace: None,
            request: Fields::new(),
            session: Fields::new(),
            environment: Fields::new(),
        }
    }

    /// 叠加调用方提供的字段；调用方的值优先，mapping 按 key 合并
    pub fn apply(mut self, options: &NoticeOptions) -> Self {
        if let Some(api_key) = &options.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(error_class) = &options.error_class {
            self.error_class = Some(error_class.clone());
        }
        if let Some(error_message) = &options.error_message {
            self.error_message = error_message.clone();
        }
        if let Some(backtrace) = &options.backtrace {
            self.backtrace = Some(backtrace.clone());
        }
        merge_into(&mut self.request, &options.request);
        merge_into(&mut self.session, &options.session);
        merge_into(&mut self.environment, &options.environment);
        self
    }

    /// 序列化为线上 YAML 文档（`notice:` 包裹）
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Envelope { notice: self })
    }
}

fn merge_into(target: &mut Fields, overlay: &Fields) {
    for (key, value) in overlay {
        target.insert(key.clone(), value.clone());
    }
}

/// 调用方对通知字段的覆盖
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticeOptions {
    pub api_key: Option<String>,
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub backtrace: Option<Vec<String>>,
    /// 合并到 `request`（与 `params` 同级）
    pub request: Fields,
    pub session: Fields,
    pub environment: Fields,
}

impl NoticeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_backtrace(mut self, frames: Vec<String>) -> Self {
        self.backtrace = Some(frames);
        self
    }

    pub fn with_request_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.insert(key.into(), value.into());
        self
    }

    pub fn with_session_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }

    pub fn with_environment_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// `warn` 的发送选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// 覆盖 error_class（默认使用 message）
    pub error_class: Option<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_class(mut self, error_class: impl Into<String>) -> Self {
        self.error_class = Some(error_class.into());
        self
    }
}
