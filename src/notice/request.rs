//! 请求上下文 - 宿主应用的请求 / 异常 / 会话数据来源

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Fields;

/// 一次被捕获的异常
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    /// 异常类型名
    pub class_name: String,
    /// 异常消息
    pub message: String,
    /// 调用栈帧（由外到内）
    pub backtrace: Option<Vec<String>>,
}

impl ExceptionInfo {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            backtrace: None,
        }
    }

    /// 设置调用栈
    pub fn with_backtrace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = Some(frames.into_iter().map(Into::into).collect());
        self
    }

    /// 从 Rust 错误构造，类型名取自 `std::any::type_name`
    pub fn from_error<E: std::error::Error + 'static>(err: &E) -> Self {
        let mut info = Self::new(std::any::type_name::<E>(), err.to_string());

        // 把 source 链附加到消息后面
        let mut source = err.source();
        while let Some(cause) = source {
            info.message.push_str(&format!(" (caused by: {})", cause));
            source = cause.source();
        }
        info
    }
}

/// 会话数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    /// 会话 ID
    pub id: Option<String>,
    pub data: Fields,
}

impl SessionData {
    /// 转为通知中的 session 字段 `{key, data}`
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "key".to_string(),
            self.id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        fields.insert("data".to_string(), Value::Object(self.data.clone()));
        fields
    }
}

/// 宿主应用的请求对象
///
/// 宿主框架实现此 trait，把自己的请求抽象暴露给通知器。
pub trait RequestContext {
    /// 本次请求中抛出的异常，按发生顺序排列
    fn exceptions(&self) -> Vec<ExceptionInfo>;

    /// 请求参数
    fn params(&self) -> Fields;

    /// 请求相关的环境变量（CGI 风格）
    fn env(&self) -> Fields {
        Fields::new()
    }

    /// 会话
    fn session(&self) -> Option<SessionData> {
        None
    }
}

/// 简单的内存请求实现
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleRequest {
    pub exceptions: Vec<ExceptionInfo>,
    pub params: Fields,
    pub env: Fields,
    pub session: Option<SessionData>,
}

impl SimpleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_session(mut self, session: SessionData) -> Self {
        self.session = Some(session);
        self
    }
}

impl RequestContext for SimpleRequest {
    fn exceptions(&self) -> Vec<ExceptionInfo> {
        self.exceptions.clone()
    }

    fn params(&self) -> Fields {
        self.params.clone()
    }

    fn env(&self) -> Fields {
        self.env.clone()
    }

    fn session(&self) -> Option<SessionData> {
        self.session.clone()
    }
}
