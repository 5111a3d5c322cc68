//! 通知器 - 构建 Notice、发送并记录结果
//!
//! 调用链完全同步：每条通知在调用线程上构建并发送，阻塞到 HTTP 往返结束。
//! `notify` / `warn` 的返回值表示"已尝试发送"，不代表服务端已接收。

use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;
use tracing::debug;

use crate::config::{ConfigResolver, EnvironmentSource, ServiceConfig, DEFAULT_ENV_VAR};
use crate::logger::{log_outcome, NoticeLogger, TracingLogger};
use crate::notice::{
    ExceptionInfo, Notice, NoticeFilter, NoticeOptions, RequestContext, SendOptions,
    DEFAULT_ERROR_MESSAGE,
};
use crate::transport::{Endpoint, HttpTransport, Outcome, Transport};

/// 异常通知器
pub struct Notifier {
    resolver: ConfigResolver,
    transport: Arc<dyn Transport>,
    logger: Arc<dyn NoticeLogger>,
    filter: NoticeFilter,
}

impl Notifier {
    /// 使用指定传输创建通知器，日志输出到 tracing
    pub fn new(resolver: ConfigResolver, transport: Arc<dyn Transport>) -> Self {
        let filter = NoticeFilter::new(&resolver.config().filters);
        Self {
            resolver,
            transport,
            logger: Arc::new(TracingLogger),
            filter,
        }
    }

    /// 根据配置创建 HTTP 通知器
    pub fn from_config(config: ServiceConfig, environment: Arc<dyn EnvironmentSource>) -> Self {
        let transport = HttpTransport::new(Endpoint::from(&config.transport));
        let resolver = ConfigResolver::new(Arc::new(config), environment);
        Self::new(resolver, Arc::new(transport))
    }

    /// 替换日志输出
    pub fn with_logger(mut self, logger: Arc<dyn NoticeLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// 默认字段：当前 API key、`Notification`、无 backtrace、空 mapping
    ///
    /// `error_class` 属于 Notice 结构本身，不在默认字段集合内，这里恒为 None。
    pub fn default_notice_options(&self) -> Notice {
        Notice::defaults(self.resolver.api_key())
    }

    /// 为请求中的每个异常发送一条通知
    ///
    /// `request` 为 None 时直接返回 None，不发送也不记录日志。
    /// 否则按异常顺序逐条发送，全部尝试后返回 `Some(true)`。
    pub fn notify(
        &self,
        request: Option<&dyn RequestContext>,
        options: &NoticeOptions,
    ) -> Option<bool> {
        let request = request?;

        for exception in request.exceptions() {
            let notice = self.build_exception_notice(&exception, request, options);
            self.send(&notice);
        }

        Some(true)
    }

    /// 发送一条警告通知
    ///
    /// error_class 优先取 `send_options.error_class`，其次是 `message`。
    pub fn warn(
        &self,
        message: Option<&str>,
        request: Option<&dyn RequestContext>,
        options: &NoticeOptions,
        send_options: &SendOptions,
    ) -> Option<bool> {
        let request = request?;

        let notice = self.build_warning_notice(message, request, options, send_options);
        self.send(&notice);

        Some(true)
    }

    /// 构建异常通知
    pub fn build_exception_notice(
        &self,
        exception: &ExceptionInfo,
        request: &dyn RequestContext,
        options: &NoticeOptions,
    ) -> Notice {
        let mut notice = self.request_notice(request);
        notice.error_class = Some(exception.class_name.clone());
        notice.error_message = exception.class_name.clone();
        notice.backtrace = exception.backtrace.clone();
        notice.apply(options)
    }

    /// 构建警告通知
    pub fn build_warning_notice(
        &self,
        message: Option<&str>,
        request: &dyn RequestContext,
        options: &NoticeOptions,
        send_options: &SendOptions,
    ) -> Notice {
        let message = message.filter(|m| !m.is_empty());

        let mut notice = self.request_notice(request);
        notice.error_class = Some(
            send_options
                .error_class
                .as_deref()
                .or(message)
                .unwrap_or(DEFAULT_ERROR_MESSAGE)
                .to_string(),
        );
        notice.error_message = message.unwrap_or(DEFAULT_ERROR_MESSAGE).to_string();
        notice.backtrace = capture_backtrace();
        notice.apply(options)
    }

    /// 发送并记录结果
    pub fn send(&self, notice: &Notice) -> Outcome {
        debug!(
            error_class = ?notice.error_class,
            has_api_key = notice.api_key.is_some(),
            "Sending notice"
        );
        let outcome = self.transport.send(notice);
        log_outcome(self.logger.as_ref(), &outcome);
        outcome
    }

    /// 默认字段 + 请求中的 params / session / environment
    fn request_notice(&self, request: &dyn RequestContext) -> Notice {
        let mut notice = self.default_notice_options();

        notice.request.insert(
            "params".to_string(),
            Value::Object(self.filter.filter_params(request.params())),
        );

        if let Some(session) = request.session() {
            notice.session = session.to_fields();
        }

        let environment = self.filter.filter_environment(request.env());
        if !environment.is_empty() {
            notice.environment = environment;
            notice.environment.insert(
                DEFAULT_ENV_VAR.to_string(),
                Value::String(self.resolver.current_environment()),
            );
        }

        notice
    }
}

/// 捕获当前调用栈；未启用 backtrace 时返回 None
fn capture_backtrace() -> Option<Vec<String>> {
    let backtrace = Backtrace::capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return None;
    }

    let frames: Vec<String> = backtrace
        .to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if frames.is_empty() {
        None
    } else {
        Some(frames)
    }
}
