//! 构建参数上下文：从环境变量一次性解析出只读的构建参数与派生标识。

use thiserror::Error;

/// 必填参数缺失时返回的错误，在任何文件读写之前触发。
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
}

pub const ENV_URL: &str = "URL";
pub const ENV_NAME: &str = "NAME";
pub const ENV_TITLE: &str = "TITLE";
pub const ENV_NAME_ZH: &str = "NAME_ZH";
pub const ENV_WIDTH: &str = "WIDTH";
pub const ENV_HEIGHT: &str = "HEIGHT";
pub const ENV_FULLSCREEN: &str = "FULLSCREEN";
pub const ENV_HIDE_TITLE_BAR: &str = "HIDE_TITLE_BAR";
pub const ENV_SHOW_SYSTEM_TRAY: &str = "SHOW_SYSTEM_TRAY";
pub const ENV_FORCE_INTERNAL_NAVIGATION: &str = "FORCE_INTERNAL_NAVIGATION";
pub const ENV_ICON: &str = "ICON";
pub const ENV_CREATE_APP: &str = "PAKE_CREATE_APP";

/// 图标来源：本地路径或远程地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    Local(String),
    Remote(String),
}

impl IconSource {
    fn parse(raw: String) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            IconSource::Remote(raw)
        } else {
            IconSource::Local(raw)
        }
    }
}

/// 一次构建所需的全部参数，创建后不再修改。
#[derive(Debug, Clone)]
pub struct BuildContext {
    url: String,
    name: String,
    title: String,
    title_zh: String,
    width: Option<String>,
    height: Option<String>,
    fullscreen: Option<bool>,
    hide_title_bar: Option<bool>,
    show_system_tray: Option<bool>,
    force_internal_navigation: Option<bool>,
    icon: Option<IconSource>,
    create_mode: bool,
}

impl BuildContext {
    /// 从进程环境变量构建上下文。
    pub fn from_env() -> Result<Self, ContextError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意查找函数构建上下文，空字符串视为未设置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ContextError::MissingParameter(key));
        let flag = |key: &str| get(key).map(|v| v == "true");

        let ctx = Self {
            url: required(ENV_URL)?,
            name: required(ENV_NAME)?,
            title: required(ENV_TITLE)?,
            title_zh: required(ENV_NAME_ZH)?,
            width: get(ENV_WIDTH),
            height: get(ENV_HEIGHT),
            fullscreen: flag(ENV_FULLSCREEN),
            hide_title_bar: flag(ENV_HIDE_TITLE_BAR),
            show_system_tray: flag(ENV_SHOW_SYSTEM_TRAY),
            force_internal_navigation: flag(ENV_FORCE_INTERNAL_NAVIGATION),
            icon: get(ENV_ICON).map(IconSource::parse),
            create_mode: get(ENV_CREATE_APP).is_some(),
        };
        tracing::debug!("build context resolved for name={}", ctx.name);
        Ok(ctx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_zh(&self) -> &str {
        &self.title_zh
    }

    /// 原始宽度字符串；只做存在性检查，不校验格式。
    pub fn width(&self) -> Option<&str> {
        self.width.as_deref()
    }

    pub fn height(&self) -> Option<&str> {
        self.height.as_deref()
    }

    pub fn fullscreen(&self) -> Option<bool> {
        self.fullscreen
    }

    pub fn hide_title_bar(&self) -> Option<bool> {
        self.hide_title_bar
    }

    pub fn show_system_tray(&self) -> Option<bool> {
        self.show_system_tray
    }

    pub fn force_internal_navigation(&self) -> Option<bool> {
        self.force_internal_navigation
    }

    pub fn icon(&self) -> Option<&IconSource> {
        self.icon.as_ref()
    }

    /// 创建模式下缺失图标只记 debug 日志。
    pub fn create_mode(&self) -> bool {
        self.create_mode
    }

    /// 打包标识，如 `com.pake.foo`。
    pub fn identifier(&self) -> String {
        format!("com.pake.{}", self.name)
    }

    /// 产品名，如 `com-pake-foo`。
    pub fn product_name(&self) -> String {
        format!("com-pake-{}", self.name)
    }
}
