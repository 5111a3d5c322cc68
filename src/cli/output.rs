//! Output formatting for CLI commands

use serde::Serialize;

/// Format output as JSON or YAML based on --json flag
pub fn format_output<T: Serialize>(data: &T, json: bool) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        serde_yaml::to_string(data).unwrap_or_else(|_| "{}\n".to_string())
    }
}

/// 遮盖 API key，只保留前 4 个字符
pub fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
