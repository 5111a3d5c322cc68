//! Exception Notifier - 把应用异常发送到远程错误追踪服务

pub mod cli;
pub mod config;
pub mod logger;
pub mod notice;
pub mod notifier;
pub mod transport;

pub use config::{
    configure, stringify_keys, ConfigError, ConfigResolver, EnvVarEnvironment, EnvironmentSource,
    FilterConfig, FixedEnvironment, ServiceConfig, TransportConfig,
};
pub use logger::{log_outcome, NoticeLogger, TracingLogger};
pub use notice::{
    ExceptionInfo, Fields, Notice, NoticeOptions, RequestContext, SendOptions, SessionData,
    SimpleRequest,
};
pub use notifier::Notifier;
pub use transport::{DryRunTransport, Endpoint, HttpTransport, Outcome, Transport};
