//! 平台描述：三个受支持平台各自需要的图标路径、配置文件与附加产物。

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::context::{BuildContext, IconSource};
use crate::icon::IconSpec;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

/// 受支持的目标平台。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// 按宿主操作系统确定平台。
    pub fn host() -> Result<Self, PlatformError> {
        std::env::consts::OS.parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }

    /// 平台配置文件名，相对 Tauri 目录。
    pub fn config_file(self) -> String {
        format!("tauri.{}.conf.json", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Macos),
            "windows" | "win32" => Ok(Platform::Windows),
            _ => Err(PlatformError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 平台独立的通用默认图标。
pub const SHARED_DEFAULT_ICON: &str = "icons/icon.png";

/// 标准 ICO 内嵌尺寸。
pub const ICO_SIZES: [u32; 6] = [16, 32, 48, 64, 128, 256];

/// 平台特有的附加产物。
#[derive(Debug, Clone)]
pub enum PlatformExtras {
    Linux {
        desktop_entry_path: String,
        install_path: String,
        content: String,
    },
    Macos {
        /// (尺寸, 相对路径)
        intermediates: Vec<(u32, String)>,
        /// 派生中间尺寸时按顺序查找的来源。
        sources: Vec<String>,
    },
    Windows {
        raster_source: String,
        composite: String,
        composite_default: String,
        resources: Vec<String>,
    },
}

/// 单个平台的完整描述，由构建参数合成。
#[derive(Debug, Clone)]
pub struct PlatformDescriptor {
    pub platform: Platform,
    pub config_file: String,
    /// 必须存在的图标。
    pub icons: Vec<IconSpec>,
    /// 写入 `bundle.icon` 的引用。
    pub bundle_icons: Vec<String>,
    pub extras: PlatformExtras,
}

impl PlatformDescriptor {
    pub fn new(platform: Platform, ctx: &BuildContext) -> Self {
        let name = ctx.name();
        match platform {
            Platform::Linux => linux(ctx),
            Platform::Macos => {
                let icns = format!("icons/{name}.icns");
                let intermediates: Vec<(u32, String)> = [32, 128, 256]
                    .into_iter()
                    .map(|size| (size, format!("png/{name}_{size}.png")))
                    .collect();
                let mut bundle_icons = vec![icns.clone()];
                bundle_icons.extend(intermediates.iter().map(|(_, p)| p.clone()));
                Self {
                    platform,
                    config_file: platform.config_file(),
                    icons: vec![IconSpec::new(
                        icns,
                        "icons/icon.icns",
                        512,
                        known_sources(ctx),
                    )],
                    bundle_icons,
                    extras: PlatformExtras::Macos {
                        intermediates,
                        sources: vec![
                            format!("png/{name}_512.png"),
                            SHARED_DEFAULT_ICON.to_string(),
                            "png/icon_512.png".to_string(),
                        ],
                    },
                }
            }
            Platform::Windows => {
                let raster = format!("png/{name}_256.png");
                let composite = format!("png/{name}.ico");
                Self {
                    platform,
                    config_file: platform.config_file(),
                    icons: vec![IconSpec::new(
                        raster.clone(),
                        "png/icon_256.png",
                        256,
                        known_sources(ctx),
                    )],
                    bundle_icons: vec![composite.clone(), raster.clone()],
                    extras: PlatformExtras::Windows {
                        raster_source: raster,
                        composite: composite.clone(),
                        composite_default: "png/icon.ico".to_string(),
                        resources: vec![composite],
                    },
                }
            }
        }
    }
}

fn linux(ctx: &BuildContext) -> PlatformDescriptor {
    let name = ctx.name();
    let product = ctx.product_name();
    let png = format!("png/{name}_512.png");
    PlatformDescriptor {
        platform: Platform::Linux,
        config_file: Platform::Linux.config_file(),
        icons: vec![IconSpec::new(
            png.clone(),
            "png/icon_512.png",
            512,
            known_sources(ctx),
        )],
        bundle_icons: vec![png],
        extras: PlatformExtras::Linux {
            desktop_entry_path: format!("assets/{product}.desktop"),
            install_path: format!("/usr/share/applications/{product}.desktop"),
            content: desktop_entry(ctx),
        },
    }
}

/// 第三层回退的已知来源：本地图标、已生成尺寸、通用默认图标。
fn known_sources(ctx: &BuildContext) -> Vec<String> {
    let name = ctx.name();
    let mut sources = Vec::new();
    if let Some(IconSource::Local(path)) = ctx.icon() {
        sources.push(path.clone());
    }
    sources.push(format!("png/{name}_512.png"));
    sources.push(format!("png/{name}_256.png"));
    sources.push(SHARED_DEFAULT_ICON.to_string());
    sources
}

/// 生成 Linux 桌面入口文件内容。
pub fn desktop_entry(ctx: &BuildContext) -> String {
    let product = ctx.product_name();
    format!(
        "[Desktop Entry]\n\
         Encoding=UTF-8\n\
         Categories=Office\n\
         Exec={product}\n\
         Icon={product}\n\
         Name={title}\n\
         Name[zh_CN]={title_zh}\n\
         StartupNotify=true\n\
         Terminal=false\n\
         Type=Application\n",
        title = ctx.title(),
        title_zh = ctx.title_zh(),
    )
}
