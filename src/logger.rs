//! 发送结果日志
//!
//! | Outcome          | 级别  | 内容                                        |
//! |------------------|-------|---------------------------------------------|
//! | Success          | info  | `Service Success: {desc}`                   |
//! | Failure          | error | `Service Failure: {desc}\n{body}`           |
//! | TransportError   | error | `Service Failure: {kind}\n` + 超时/错误提示 |

use crate::transport::Outcome;

/// 超时提示
pub const TIMEOUT_MESSAGE: &str = "Timeout while contacting the service.";

/// 其它传输错误提示
pub const TRANSPORT_ERROR_MESSAGE: &str = "Error while contacting the service.";

/// 接收分级日志的能力，实现不得 panic
pub trait NoticeLogger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// 输出到 tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl NoticeLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "exception_notifier::outcome", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "exception_notifier::outcome", "{}", message);
    }
}

/// 把发送结果写入日志
pub fn log_outcome(logger: &dyn NoticeLogger, outcome: &Outcome) {
    match outcome {
        Outcome::Success { status_description } => {
            logger.info(&format!("Service Success: {}", status_description));
        }
        Outcome::Failure {
            status_description,
            body,
        } => {
            logger.error(&format!("Service Failure: {}\n{}", status_description, body));
        }
        Outcome::TransportError {
            exception_description,
            timeout,
        } => {
            logger.error(&format!("Service Failure: {}\n", exception_description));
            if *timeout {
                logger.error(TIMEOUT_MESSAGE);
            } else {
                logger.error(TRANSPORT_ERROR_MESSAGE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<(&'static str, String)>>,
    }

    impl NoticeLogger for RecordingLogger {
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(("info", message.to_string()));
        }

        fn error(&self, message: &str) {
            self.lines.lock().unwrap().push(("error", message.to_string()));
        }
    }

    fn lines(outcome: &Outcome) -> Vec<(&'static str, String)> {
        let logger = RecordingLogger::default();
        log_outcome(&logger, outcome);
        let lines = logger.lines.lock().unwrap().clone();
        lines
    }

    #[test]
    fn test_success_logs_one_info_line() {
        let outcome = Outcome::Success {
            status_description: "200 OK".to_string(),
        };
        assert_eq!(lines(&outcome), vec![("info", "Service Success: 200 OK".to_string())]);
    }

    #[test]
    fn test_failure_logs_one_error_line_with_body() {
        let outcome = Outcome::Failure {
            status_description: "500 Internal Server Error".to_string(),
            body: "Upstream unavailable".to_string(),
        };
        assert_eq!(
            lines(&outcome),
            vec![(
                "error",
                "Service Failure: 500 Internal Server Error\nUpstream unavailable".to_string()
            )]
        );
    }

    #[test]
    fn test_timeout_logs_two_error_lines() {
        let outcome = Outcome::TransportError {
            exception_description: "Timeout".to_string(),
            timeout: true,
        };
        assert_eq!(
            lines(&outcome),
            vec![
                ("error", "Service Failure: Timeout\n".to_string()),
                ("error", TIMEOUT_MESSAGE.to_string()),
            ]
        );
    }

    #[test]
    fn test_other_transport_error_uses_generic_message() {
        let outcome = Outcome::TransportError {
            exception_description: "ConnectError".to_string(),
            timeout: false,
        };
        let lines = lines(&outcome);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], ("error", TRANSPORT_ERROR_MESSAGE.to_string()));
    }

    #[traced_test]
    #[test]
    fn test_tracing_logger_forwards_levels() {
        log_outcome(
            &TracingLogger,
            &Outcome::Success {
                status_description: "200 OK".to_string(),
            },
        );
        log_outcome(
            &TracingLogger,
            &Outcome::TransportError {
                exception_description: "Timeout".to_string(),
                timeout: true,
            },
        );

        assert!(logs_contain("Service Success: 200 OK"));
        assert!(logs_contain(TIMEOUT_MESSAGE));
    }
}
