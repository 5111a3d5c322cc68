//! Config 命令 - 查看已加载的服务配置

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::output::{format_output, mask_key};
use crate::config::{EnvVarEnvironment, EnvironmentSource, FixedEnvironment, ServiceConfig};
use crate::transport::Endpoint;

/// Config 命令参数
#[derive(Args)]
pub struct ConfigArgs {
    /// 应用根目录（读取 <root>/config/service.yml）
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// 部署环境（默认读取 APP_ENV）
    #[arg(long)]
    pub env: Option<String>,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 单个环境的摘要
#[derive(Debug, Serialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub api_key: Option<String>,
}

/// Config 命令输出
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub path: String,
    pub current_environment: String,
    pub api_key_configured: bool,
    pub endpoint: String,
    pub environments: Vec<EnvironmentSummary>,
}

impl ConfigSummary {
    pub fn new(path: String, config: &ServiceConfig, current_environment: String) -> Self {
        let environments = config
            .environment_names()
            .into_iter()
            .map(|name| EnvironmentSummary {
                name: name.to_string(),
                api_key: config.api_key_for(name).map(mask_key),
            })
            .collect();

        Self {
            path,
            api_key_configured: config.api_key_for(&current_environment).is_some(),
            current_environment,
            endpoint: Endpoint::from(&config.transport).base_url(),
            environments,
        }
    }
}

/// 根据 --env 选择环境来源
pub fn environment_source(env: Option<&str>) -> Arc<dyn EnvironmentSource> {
    match env {
        Some(name) => Arc::new(FixedEnvironment::new(name)),
        None => Arc::new(EnvVarEnvironment::default()),
    }
}

/// 处理 config 命令
pub fn handle_config(args: ConfigArgs) -> Result<()> {
    let path = ServiceConfig::path(&args.root);
    let config = ServiceConfig::load(&args.root)
        .with_context(|| format!("Cannot load service config from {}", path.display()))?;

    let current = environment_source(args.env.as_deref()).current();
    let summary = ConfigSummary::new(path.display().to_string(), &config, current);

    print!("{}", format_output(&summary, args.json));
    if args.json {
        println!();
    }
    Ok(())
}
