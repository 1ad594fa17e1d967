//! 基础配置修改：把构建参数稀疏地覆盖到 pake.json 与 tauri.conf.json 上。

use serde_json::{Map, Value};

use crate::config::{object_mut, JsonConfig};
use crate::context::BuildContext;

const TRAY_PLATFORMS: [&str; 3] = ["macos", "linux", "windows"];

/// 所有平台共享的两份基础配置。
#[derive(Debug, Clone)]
pub struct BaseConfigs {
    pub app: JsonConfig,
    pub framework: JsonConfig,
}

impl BaseConfigs {
    pub fn new(app: JsonConfig, framework: JsonConfig) -> Self {
        Self { app, framework }
    }

    /// 应用参数：可选参数仅在提供时覆盖，URL、标题与标识总是写入。
    pub fn apply(&mut self, ctx: &BuildContext) {
        apply_app(self.app.root_mut(), ctx);
        apply_framework(self.framework.root_mut(), ctx);
        tracing::info!(
            "base configs updated: identifier={} url={}",
            ctx.identifier(),
            ctx.url()
        );
    }

    pub fn save(&self) -> Result<(), crate::config::ConfigError> {
        self.app.save()?;
        self.framework.save()
    }
}

fn apply_app(root: &mut Map<String, Value>, ctx: &BuildContext) {
    let window = first_window_mut(root);
    window.insert("url".into(), Value::from(ctx.url()));
    window.insert("title".into(), Value::from(ctx.title()));

    if let Some(width) = ctx.width() {
        set_dimension(window, "width", width);
    }
    if let Some(height) = ctx.height() {
        set_dimension(window, "height", height);
    }
    if let Some(fullscreen) = ctx.fullscreen() {
        window.insert("fullscreen".into(), Value::Bool(fullscreen));
    }
    if let Some(hide) = ctx.hide_title_bar() {
        window.insert("hide_title_bar".into(), Value::Bool(hide));
    }
    if let Some(internal) = ctx.force_internal_navigation() {
        window.insert("force_internal_navigation".into(), Value::Bool(internal));
    }

    if let Some(show) = ctx.show_system_tray() {
        let tray = object_mut(root, "system_tray");
        for platform in TRAY_PLATFORMS {
            tray.insert(platform.into(), Value::Bool(show));
        }
    }

    set_identity(root, ctx);
}

fn apply_framework(root: &mut Map<String, Value>, ctx: &BuildContext) {
    set_identity(root, ctx);
}

/// 标识与产品名在每份配置里必须一致。
pub(crate) fn set_identity(root: &mut Map<String, Value>, ctx: &BuildContext) {
    root.insert("identifier".into(), Value::from(ctx.identifier()));
    root.insert("productName".into(), Value::from(ctx.product_name()));
}

/// 数值解析失败时保留模板原值。
fn set_dimension(window: &mut Map<String, Value>, key: &str, raw: &str) {
    match raw.trim().parse::<u32>() {
        Ok(v) => {
            window.insert(key.into(), Value::from(v));
        }
        Err(_) => {
            tracing::warn!("ignoring non-numeric {} value: {}", key, raw);
        }
    }
}

/// 返回 `windows[0]`，缺失时创建。
fn first_window_mut(root: &mut Map<String, Value>) -> &mut Map<String, Value> {
    let windows = root
        .entry("windows")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !windows.is_array() {
        *windows = Value::Array(Vec::new());
    }
    let Value::Array(list) = windows else {
        unreachable!("windows was just replaced with an array")
    };
    if list.is_empty() {
        list.push(Value::Object(Map::new()));
    }
    if !list[0].is_object() {
        list[0] = Value::Object(Map::new());
    }
    match &mut list[0] {
        Value::Object(window) => window,
        _ => unreachable!("first window was just replaced with an object"),
    }
}
