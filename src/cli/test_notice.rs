//! Test 命令 - 发送一条测试通知，验证配置和连通性

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use super::output::format_output;
use super::show_config::environment_source;
use crate::config::{ConfigResolver, ServiceConfig};
use crate::notice::{NoticeOptions, SendOptions, SimpleRequest};
use crate::notifier::Notifier;
use crate::transport::{DryRunTransport, Endpoint, HttpTransport, Outcome, Transport};

/// 测试通知的默认消息
pub const TEST_MESSAGE: &str = "Testing exception notification";

/// 测试通知的 error_class
pub const TEST_ERROR_CLASS: &str = "NoticeTest";

/// Test 命令参数
#[derive(Args)]
pub struct TestArgs {
    /// 应用根目录（读取 <root>/config/service.yml）
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// 部署环境（默认读取 APP_ENV）
    #[arg(long)]
    pub env: Option<String>,

    /// 通知消息
    #[arg(long, short, default_value = TEST_MESSAGE)]
    pub message: String,

    /// error_class
    #[arg(long, default_value = TEST_ERROR_CLASS)]
    pub error_class: String,

    /// 只打印请求体，不发送
    #[arg(long)]
    pub dry_run: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// Test 命令输出
#[derive(Debug, Serialize)]
pub struct TestOutput {
    pub environment: String,
    pub api_key_configured: bool,
    pub delivered: bool,
    pub outcome: String,
}

impl TestOutput {
    pub fn new(environment: String, api_key_configured: bool, outcome: &Outcome) -> Self {
        let description = match outcome {
            Outcome::Success { status_description } => status_description.clone(),
            Outcome::Failure {
                status_description, ..
            } => status_description.clone(),
            Outcome::TransportError {
                exception_description,
                ..
            } => exception_description.clone(),
        };

        Self {
            environment,
            api_key_configured,
            delivered: outcome.is_success(),
            outcome: description,
        }
    }
}

/// 发送测试通知
///
/// 字段与 `Notifier::warn` 构建的完全相同，只发送一次；
/// 直接调用 `send` 以便拿到 [`Outcome`] 输出给用户，日志与 `warn` 一致。
pub fn send_test_notice(notifier: &Notifier, message: &str, error_class: &str) -> Outcome {
    let request = SimpleRequest::new().with_param("action", "test");
    let notice = notifier.build_warning_notice(
        Some(message),
        &request,
        &NoticeOptions::new(),
        &SendOptions::new().with_error_class(error_class),
    );
    notifier.send(&notice)
}

/// 处理 test 命令
pub fn handle_test(args: TestArgs) -> Result<()> {
    let path = ServiceConfig::path(&args.root);
    let config = ServiceConfig::load(&args.root)
        .with_context(|| format!("Cannot load service config from {}", path.display()))?;

    let endpoint = Endpoint::from(&config.transport);
    let transport: Arc<dyn Transport> = if args.dry_run {
        Arc::new(DryRunTransport::new(endpoint))
    } else {
        Arc::new(HttpTransport::new(endpoint))
    };

    let resolver = ConfigResolver::new(Arc::new(config), environment_source(args.env.as_deref()));
    let environment = resolver.current_environment();
    let api_key_configured = resolver.api_key().is_some();
    if !api_key_configured {
        warn!(environment = %environment, "No api_key configured, sending anyway");
    }

    let notifier = Notifier::new(resolver, transport);
    let outcome = send_test_notice(&notifier, &args.message, &args.error_class);

    let output = TestOutput::new(environment, api_key_configured, &outcome);
    print!("{}", format_output(&output, args.json));
    if args.json {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedEnvironment;
    use crate::notice::Notice;
    use std::sync::Mutex;

    /// 记录发送内容的 mock 传输
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Notice>>,
    }

    impl Transport for RecordingTransport {
        fn send(&self, notice: &Notice) -> Outcome {
            self.sent.lock().unwrap().push(notice.clone());
            Outcome::Success {
                status_description: "200 OK".to_string(),
            }
        }
    }

    fn notifier(transport: &Arc<RecordingTransport>) -> Notifier {
        let config = ServiceConfig::new().with_environment("production", "UBERSECRETSHIT");
        let resolver = ConfigResolver::new(
            Arc::new(config),
            Arc::new(FixedEnvironment::new("production")),
        );
        Notifier::new(resolver, transport.clone())
    }

    #[test]
    fn test_send_test_notice_matches_warn() {
        let via_cli = Arc::new(RecordingTransport::default());
        let outcome = send_test_notice(&notifier(&via_cli), TEST_MESSAGE, TEST_ERROR_CLASS);
        assert!(outcome.is_success());

        let via_warn = Arc::new(RecordingTransport::default());
        let request = SimpleRequest::new().with_param("action", "test");
        notifier(&via_warn).warn(
            Some(TEST_MESSAGE),
            Some(&request),
            &NoticeOptions::new(),
            &SendOptions::new().with_error_class(TEST_ERROR_CLASS),
        );

        let mut cli_sent = via_cli.sent.lock().unwrap().clone();
        let mut warn_sent = via_warn.sent.lock().unwrap().clone();
        assert_eq!(cli_sent.len(), 1);
        assert_eq!(warn_sent.len(), 1);

        // backtrace 取决于 RUST_BACKTRACE，不参与比较
        cli_sent[0].backtrace = None;
        warn_sent[0].backtrace = None;
        assert_eq!(cli_sent, warn_sent);
        assert_eq!(cli_sent[0].error_class.as_deref(), Some(TEST_ERROR_CLASS));
        assert_eq!(cli_sent[0].error_message, TEST_MESSAGE);
    }

    #[test]
    fn test_output_from_outcomes() {
        let ok = TestOutput::new(
            "production".to_string(),
            true,
            &Outcome::Success {
                status_description: "200 OK".to_string(),
            },
        );
        assert!(ok.delivered);
        assert_eq!(ok.outcome, "200 OK");

        let timeout = TestOutput::new(
            "production".to_string(),
            false,
            &Outcome::TransportError {
                exception_description: "Timeout".to_string(),
                timeout: true,
            },
        );
        assert!(!timeout.delivered);
        assert_eq!(timeout.outcome, "Timeout");
    }
}
