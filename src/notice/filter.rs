//! 敏感数据过滤

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::warn;

use super::Fields;
use crate::config::FilterConfig;

/// 被过滤参数的替换值
pub const FILTERED: &str = "[FILTERED]";

/// 参数和环境变量过滤器（大小写不敏感）
#[derive(Debug, Clone, Default)]
pub struct NoticeFilter {
    params: Vec<Regex>,
    environment: Vec<Regex>,
}

impl NoticeFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            params: compile_all(&config.params_filters),
            environment: compile_all(&config.environment_filters),
        }
    }

    /// 把 key 命中过滤规则的参数值替换为 `[FILTERED]`，递归处理嵌套对象
    pub fn filter_params(&self, params: Fields) -> Fields {
        params
            .into_iter()
            .map(|(key, value)| {
                if matches_any(&self.params, &key) {
                    (key, Value::String(FILTERED.to_string()))
                } else {
                    let value = match value {
                        Value::Object(nested) => Value::Object(self.filter_params(nested)),
                        other => other,
                    };
                    (key, value)
                }
            })
            .collect()
    }

    /// 丢弃 key 命中过滤规则的环境变量
    pub fn filter_environment(&self, environment: Fields) -> Fields {
        environment
            .into_iter()
            .filter(|(key, _)| !matches_any(&self.environment, key))
            .collect()
    }
}

fn matches_any(patterns: &[Regex], key: &str) -> bool {
    patterns.iter().any(|p| p.is_match(key))
}

fn compile_all(patterns: &[String]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| compile(p)).collect()
}

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            // 非法正则按字面量匹配
            warn!(pattern = %pattern, error = %e, "Invalid filter pattern, matching literally");
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .ok()
        }
    }
}
