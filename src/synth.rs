//! 平台配置合成：把图标引用、标识与平台附加项写入平台配置。

use std::fs;
use std::io;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::base::set_identity;
use crate::config::{object_at, JsonConfig};
use crate::context::BuildContext;
use crate::fetch::IconFetcher;
use crate::icon::{derive_png, EnsureOutcome, IconError, IconReport, IconResolver, Tier};
use crate::platform::{PlatformDescriptor, PlatformExtras};

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 在所有必需图标解析完成后调用，返回附加项中生成图标的结果。
pub fn synthesize<F: IconFetcher>(
    descriptor: &PlatformDescriptor,
    config: &mut JsonConfig,
    ctx: &BuildContext,
    resolver: &IconResolver<'_, F>,
) -> Result<Vec<IconReport>, SynthError> {
    let root = config.root_mut();
    let reports = match &descriptor.extras {
        PlatformExtras::Linux {
            desktop_entry_path,
            install_path,
            content,
        } => {
            let path = resolver.base().join(desktop_entry_path);
            write_text(&path, content)?;
            object_at(root, &["bundle", "linux", "deb", "files"])
                .insert(install_path.clone(), Value::from(desktop_entry_path.as_str()));
            tracing::info!("desktop entry written to {}", path.display());
            Vec::new()
        }
        PlatformExtras::Macos {
            intermediates,
            sources,
        } => intermediates
            .iter()
            .map(|(size, rel)| IconReport {
                path: rel.clone(),
                outcome: ensure_intermediate(resolver, rel, *size, sources),
            })
            .collect(),
        PlatformExtras::Windows {
            raster_source,
            composite,
            composite_default,
            resources,
        } => {
            let outcome = resolver.generate_composite(raster_source, composite, composite_default);
            append_unique(object_at(root, &["bundle"]), "resources", resources);
            vec![IconReport {
                path: composite.clone(),
                outcome,
            }]
        }
    };

    let icons: Vec<Value> = descriptor
        .bundle_icons
        .iter()
        .filter(|rel| {
            !matches!(descriptor.extras, PlatformExtras::Macos { .. })
                || resolver.base().join(rel).is_file()
        })
        .map(|rel| Value::from(rel.as_str()))
        .collect();
    object_at(root, &["bundle"]).insert("icon".into(), Value::Array(icons));
    set_identity(root, ctx);

    tracing::debug!(
        "{} config synthesized with {} generated icon(s)",
        descriptor.platform,
        reports.len()
    );
    Ok(reports)
}

/// 仅在缺失时按来源顺序派生中间尺寸。
fn ensure_intermediate<F: IconFetcher>(
    resolver: &IconResolver<'_, F>,
    rel: &str,
    size: u32,
    sources: &[String],
) -> Result<EnsureOutcome, IconError> {
    let target = resolver.base().join(rel);
    if target.exists() {
        return Ok(EnsureOutcome {
            created: false,
            tier: Tier::Existing,
        });
    }
    let source = sources
        .iter()
        .map(|s| resolver.base().join(s))
        .find(|p| p.is_file())
        .ok_or_else(|| IconError::Unavailable(rel.to_string()))?;
    derive_png(&source, &target, size)?;
    tracing::info!("generated {} from {}", rel, source.display());
    Ok(EnsureOutcome {
        created: true,
        tier: Tier::Generated,
    })
}

fn write_text(path: &std::path::Path, content: &str) -> Result<(), SynthError> {
    let io_err = |source| SynthError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, content).map_err(io_err)
}

/// 向数组追加尚不存在的条目。
fn append_unique(map: &mut Map<String, Value>, key: &str, items: &[String]) {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(list) = slot {
        for item in items {
            if !list.iter().any(|v| v.as_str() == Some(item)) {
                list.push(Value::from(item.as_str()));
            }
        }
    }
}
