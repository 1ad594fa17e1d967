//! 单次构建流水线：参数 → 基础配置 → 图标解析 → 平台配置合成 → 写回。

use std::path::PathBuf;

use thiserror::Error;

use crate::base::BaseConfigs;
use crate::config::{ConfigError, JsonConfig};
use crate::context::{BuildContext, IconSource};
use crate::fetch::IconFetcher;
use crate::icon::{IconReport, IconResolver};
use crate::platform::{Platform, PlatformDescriptor, PlatformError};
use crate::synth::{synthesize, SynthError};

pub const APP_CONFIG: &str = "pake.json";
pub const FRAMEWORK_CONFIG: &str = "tauri.conf.json";

/// 流水线运行期的文件层面错误；参数与平台在进入流水线前已校验。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Synth(#[from] SynthError),
}

/// 一次运行的结果汇总。
#[derive(Debug)]
pub struct RunReport {
    pub platform: Platform,
    pub icons: Vec<IconReport>,
}

impl RunReport {
    /// 本次新生成或拷贝的图标数量。
    pub fn created(&self) -> usize {
        self.icons
            .iter()
            .filter(|r| matches!(&r.outcome, Ok(o) if o.created))
            .count()
    }

    /// 最终仍缺失的图标路径。
    pub fn missing(&self) -> Vec<&str> {
        self.icons
            .iter()
            .filter(|r| r.outcome.is_err())
            .map(|r| r.path.as_str())
            .collect()
    }
}

/// 命令行未指定平台时使用宿主平台。
pub fn resolve_platform(arg: Option<&str>) -> Result<Platform, PlatformError> {
    match arg {
        Some(name) => name.parse(),
        None => Platform::host(),
    }
}

pub struct Pipeline<F> {
    tauri_dir: PathBuf,
    platform: Platform,
    fetcher: F,
}

impl<F: IconFetcher> Pipeline<F> {
    pub fn new(tauri_dir: impl Into<PathBuf>, platform: Platform, fetcher: F) -> Self {
        Self {
            tauri_dir: tauri_dir.into(),
            platform,
            fetcher,
        }
    }

    pub async fn run(&self, ctx: &BuildContext) -> Result<RunReport, PipelineError> {
        let descriptor = PlatformDescriptor::new(self.platform, ctx);

        // 先加载全部模板，任何一个缺失都不会留下半写的状态
        let mut base = BaseConfigs::new(
            JsonConfig::load(self.tauri_dir.join(APP_CONFIG))?,
            JsonConfig::load(self.tauri_dir.join(FRAMEWORK_CONFIG))?,
        );
        let mut platform_config = JsonConfig::load(self.tauri_dir.join(&descriptor.config_file))?;

        base.apply(ctx);

        let remote = match ctx.icon() {
            Some(IconSource::Remote(url)) => Some(url.clone()),
            _ => None,
        };
        let mut resolver = IconResolver::new(&self.tauri_dir, remote, &self.fetcher);

        let mut icons = Vec::with_capacity(descriptor.icons.len());
        for spec in &descriptor.icons {
            let outcome = resolver.ensure(spec).await;
            icons.push(IconReport {
                path: spec.path.clone(),
                outcome,
            });
        }
        icons.extend(synthesize(&descriptor, &mut platform_config, ctx, &resolver)?);

        for report in &icons {
            match &report.outcome {
                Ok(outcome) => {
                    tracing::debug!("icon {} ok ({})", report.path, outcome.tier)
                }
                // 缺图标不会中断构建，仅在非创建模式下报错
                Err(e) if ctx.create_mode() => tracing::debug!("{}", e),
                Err(e) => tracing::error!("{}", e),
            }
        }

        base.save()?;
        platform_config.save()?;

        Ok(RunReport {
            platform: self.platform,
            icons,
        })
    }
}
