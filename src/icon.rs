//! 图标解析引擎：按层级回退保证每个平台所需的图标文件存在且格式正确。
//!
//! 回退顺序：已存在 > 远程下载 > 已知本地来源 > 平台默认图标。
//! 复合容器（ICO/ICNS）只接受同格式字节原样拷贝或由多尺寸生成器产出，
//! 不会经过单张 PNG 的重编码路径。

use std::fmt;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use crate::fetch::IconFetcher;
use crate::platform::ICO_SIZES;

/// ICNS 内嵌尺寸。
const ICNS_SIZES: [u32; 6] = [16, 32, 64, 128, 256, 512];

const ICO_MAGIC: [u8; 4] = [0, 0, 1, 0];
const ICNS_MAGIC: &[u8; 4] = b"icns";

/// 图标相关错误，除 `Unavailable` 外都只会触发下一层回退。
#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon fetch failed: {0}")]
    Fetch(String),
    #[error("icon conversion failed: {0}")]
    Conversion(String),
    #[error("icon generation failed: {0}")]
    Generation(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no icon available for {0}")]
    Unavailable(String),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> IconError + '_ {
    move |source| IconError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// 目标文件格式，由扩展名决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFormat {
    /// 单张栅格图
    Png,
    /// 多分辨率容器
    Ico,
    Icns,
}

impl IconFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(IconFormat::Png),
            "ico" => Some(IconFormat::Ico),
            "icns" => Some(IconFormat::Icns),
            _ => None,
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, IconFormat::Ico | IconFormat::Icns)
    }

    /// 按魔数判断字节是否已是该格式。
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            IconFormat::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            IconFormat::Ico => bytes.starts_with(&ICO_MAGIC),
            IconFormat::Icns => bytes.starts_with(ICNS_MAGIC),
        }
    }
}

/// 一个必须存在的图标：目标路径、平台默认图标、格式、边长与已知来源。
#[derive(Debug, Clone)]
pub struct IconSpec {
    pub path: String,
    pub fallback: String,
    pub format: IconFormat,
    pub size: u32,
    pub sources: Vec<String>,
}

impl IconSpec {
    /// 格式取自目标扩展名，无法识别时按 PNG 处理。
    pub fn new(
        path: impl Into<String>,
        fallback: impl Into<String>,
        size: u32,
        sources: Vec<String>,
    ) -> Self {
        let path = path.into();
        let format = IconFormat::from_path(&path).unwrap_or(IconFormat::Png);
        Self {
            path,
            fallback: fallback.into(),
            format,
            size,
            sources,
        }
    }
}

/// 图标最终由哪一层得到。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Existing,
    Remote,
    KnownSource,
    BundledDefault,
    Generated,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Existing => "existing",
            Tier::Remote => "remote",
            Tier::KnownSource => "known source",
            Tier::BundledDefault => "bundled default",
            Tier::Generated => "generated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub created: bool,
    pub tier: Tier,
}

impl EnsureOutcome {
    fn existing() -> Self {
        Self {
            created: false,
            tier: Tier::Existing,
        }
    }

    fn created(tier: Tier) -> Self {
        Self {
            created: true,
            tier,
        }
    }
}

/// 单个图标路径的处理结果。
#[derive(Debug)]
pub struct IconReport {
    pub path: String,
    pub outcome: Result<EnsureOutcome, IconError>,
}

/// 远程图标只下载一次，结果在本次运行内复用。
enum RemoteState {
    Pending(String),
    Fetched(Vec<u8>),
    Failed,
    Absent,
}

/// 图标解析器：持有 Tauri 目录与下载能力。
pub struct IconResolver<'a, F> {
    base: PathBuf,
    fetcher: &'a F,
    remote: RemoteState,
}

impl<'a, F: IconFetcher> IconResolver<'a, F> {
    pub fn new(base: impl Into<PathBuf>, remote_url: Option<String>, fetcher: &'a F) -> Self {
        let remote = match remote_url {
            Some(url) => RemoteState::Pending(url),
            None => RemoteState::Absent,
        };
        Self {
            base: base.into(),
            fetcher,
            remote,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// 保证 `spec.path` 存在；逐层尝试，首个成功即返回。
    pub async fn ensure(&mut self, spec: &IconSpec) -> Result<EnsureOutcome, IconError> {
        let target = self.base.join(&spec.path);
        if target.exists() {
            tracing::debug!("icon already present: {}", target.display());
            return Ok(EnsureOutcome::existing());
        }
        for tier in [Tier::Remote, Tier::KnownSource, Tier::BundledDefault] {
            let attempt = match tier {
                Tier::Remote => self.try_remote(spec, &target).await,
                Tier::KnownSource => self.try_known_sources(spec, &target),
                _ => self.try_bundled_default(spec, &target),
            };
            match attempt {
                Ok(true) => {
                    tracing::info!("icon {} resolved via {}", spec.path, tier);
                    return Ok(EnsureOutcome::created(tier));
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("{} tier failed for {}: {}", tier, spec.path, e),
            }
        }
        Err(IconError::Unavailable(spec.path.clone()))
    }

    async fn remote_bytes(&mut self) -> Option<&[u8]> {
        if let RemoteState::Pending(url) = &self.remote {
            let url = url.clone();
            self.remote = match self.fetcher.fetch(&url).await {
                Ok(bytes) => RemoteState::Fetched(bytes),
                Err(e) => {
                    tracing::warn!("{}", e);
                    RemoteState::Failed
                }
            };
        }
        match &self.remote {
            RemoteState::Fetched(bytes) => Some(bytes),
            _ => None,
        }
    }

    async fn try_remote(&mut self, spec: &IconSpec, target: &Path) -> Result<bool, IconError> {
        let Some(bytes) = self.remote_bytes().await else {
            return Ok(false);
        };
        materialize(bytes, spec, target)?;
        Ok(true)
    }

    fn try_known_sources(&self, spec: &IconSpec, target: &Path) -> Result<bool, IconError> {
        let found = spec
            .sources
            .iter()
            .map(|s| self.base.join(s))
            .find(|p| p.as_path() != target && p.is_file());
        let Some(source) = found else {
            return Ok(false);
        };
        tracing::debug!("deriving {} from {}", spec.path, source.display());
        let bytes = fs::read(&source).map_err(io_err(&source))?;
        materialize(&bytes, spec, target)?;
        Ok(true)
    }

    fn try_bundled_default(&self, spec: &IconSpec, target: &Path) -> Result<bool, IconError> {
        let fallback = self.base.join(&spec.fallback);
        if !fallback.is_file() {
            return Ok(false);
        }
        create_parent(target)?;
        fs::copy(&fallback, target).map_err(io_err(target))?;
        if spec.format != IconFormat::Png {
            return Ok(true);
        }
        match coerce_rgba_png(target, spec.size) {
            Ok(rewritten) => {
                if rewritten {
                    tracing::debug!("normalized copied default {}", target.display());
                }
                Ok(true)
            }
            Err(e) => {
                // 不合格的副本不能留在目标路径，否则下次运行会被当作已存在
                fs::remove_file(target).map_err(io_err(target))?;
                Err(e)
            }
        }
    }

    /// 从已存在的栅格图生成多尺寸 ICO；失败时回退为拷贝平台默认 ICO。
    pub fn generate_composite(
        &self,
        source: &str,
        target: &str,
        fallback: &str,
    ) -> Result<EnsureOutcome, IconError> {
        let target_path = self.base.join(target);
        if target_path.exists() {
            tracing::debug!("composite icon already present: {}", target_path.display());
            return Ok(EnsureOutcome::existing());
        }
        create_parent(&target_path)?;

        let generated = read_image(&self.base.join(source))
            .and_then(|img| encode_ico(&img, &ICO_SIZES))
            .and_then(|bytes| fs::write(&target_path, bytes).map_err(io_err(&target_path)));
        match generated {
            Ok(()) => {
                tracing::info!("generated {} with sizes {:?}", target, ICO_SIZES);
                return Ok(EnsureOutcome::created(Tier::Generated));
            }
            Err(e) => tracing::warn!("{}; falling back to {}", e, fallback),
        }

        let fallback_path = self.base.join(fallback);
        if !fallback_path.is_file() {
            return Err(IconError::Unavailable(target.to_string()));
        }
        fs::copy(&fallback_path, &target_path).map_err(io_err(&target_path))?;
        Ok(EnsureOutcome::created(Tier::BundledDefault))
    }
}

/// 把来源字节按目标格式落盘。
fn materialize(bytes: &[u8], spec: &IconSpec, target: &Path) -> Result<(), IconError> {
    let out = match spec.format {
        IconFormat::Png => encode_png(contain(&decode(bytes)?, spec.size))?,
        format if format.is_composite() && format.matches(bytes) => {
            tracing::debug!("copying {:?} container through unchanged", format);
            bytes.to_vec()
        }
        IconFormat::Ico => encode_ico(&decode(bytes)?, &ICO_SIZES)?,
        IconFormat::Icns => encode_icns(&decode(bytes)?)?,
    };
    create_parent(target)?;
    fs::write(target, out).map_err(io_err(target))
}

fn create_parent(path: &Path) -> Result<(), IconError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(io_err(parent)),
        None => Ok(()),
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, IconError> {
    image::load_from_memory(bytes).map_err(|e| IconError::Conversion(e.to_string()))
}

fn read_image(path: &Path) -> Result<DynamicImage, IconError> {
    let bytes = fs::read(path).map_err(io_err(path))?;
    decode(&bytes)
}

/// 等比缩放后居中放到透明方形画布上。
pub fn contain(img: &DynamicImage, size: u32) -> RgbaImage {
    let resized = img.resize(size, size, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let x = (size - resized.width().min(size)) / 2;
    let y = (size - resized.height().min(size)) / 2;
    imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));
    canvas
}

pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>, IconError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| IconError::Conversion(e.to_string()))?;
    Ok(buf.into_inner())
}

/// 生成包含多个尺寸的 ICO。
pub fn encode_ico(img: &DynamicImage, sizes: &[u32]) -> Result<Vec<u8>, IconError> {
    let mut dir = ico::IconDir::new(ico::ResourceType::Icon);
    for &size in sizes {
        let rgba = contain(img, size);
        let image = ico::IconImage::from_rgba_data(size, size, rgba.into_raw());
        let entry = ico::IconDirEntry::encode(&image)
            .map_err(|e| IconError::Generation(format!("ico {size}px: {e}")))?;
        dir.add_entry(entry);
    }
    let mut buf = Vec::new();
    dir.write(&mut buf)
        .map_err(|e| IconError::Generation(e.to_string()))?;
    Ok(buf)
}

pub fn encode_icns(img: &DynamicImage) -> Result<Vec<u8>, IconError> {
    let mut family = icns::IconFamily::new();
    for size in ICNS_SIZES {
        let rgba = contain(img, size);
        let image = icns::Image::from_data(icns::PixelFormat::RGBA, size, size, rgba.into_raw())
            .map_err(|e| IconError::Generation(format!("icns {size}px: {e}")))?;
        family
            .add_icon(&image)
            .map_err(|e| IconError::Generation(format!("icns {size}px: {e}")))?;
    }
    let mut buf = Vec::new();
    family
        .write(&mut buf)
        .map_err(|e| IconError::Generation(e.to_string()))?;
    Ok(buf)
}

/// 从来源栅格图派生指定边长的 PNG。
pub fn derive_png(source: &Path, target: &Path, size: u32) -> Result<(), IconError> {
    let img = read_image(source)?;
    let bytes = encode_png(contain(&img, size))?;
    create_parent(target)?;
    fs::write(target, bytes).map_err(io_err(target))
}

/// 确保 PNG 为 RGBA8 且尺寸正确；返回是否重写了文件。
pub fn coerce_rgba_png(path: &Path, size: u32) -> Result<bool, IconError> {
    let img = read_image(path)?;
    if img.color() == ColorType::Rgba8 && img.dimensions() == (size, size) {
        return Ok(false);
    }
    let bytes = encode_png(contain(&img, size))?;
    fs::write(path, bytes).map_err(io_err(path))?;
    Ok(true)
}
