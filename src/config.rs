//! 配置模块：负责读取磁盘上的 JSON 模板配置并按统一格式写回。

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use thiserror::Error;

/// 配置相关错误类型，统一封装 IO、解析与语义错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// 一个可变的 JSON 模板文件：加载后在内存中修改，最后整体写回。
#[derive(Debug, Clone)]
pub struct JsonConfig {
    path: PathBuf,
    value: Value,
}

impl JsonConfig {
    /// 从给定路径加载配置文件，根节点必须是对象。
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let data = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(ConfigError::Invalid(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }
        tracing::debug!("loaded config {}", path.display());
        Ok(Self { path, value })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// 根对象的可变引用。
    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        if !self.value.is_object() {
            self.value = Value::Object(Map::new());
        }
        match &mut self.value {
            Value::Object(map) => map,
            _ => unreachable!("root was just replaced with an object"),
        }
    }

    /// 将配置以两空格缩进、末尾换行的格式写回原路径。
    pub fn save(&self) -> Result<(), ConfigError> {
        let text = to_pretty_string(&self.value)?;
        fs::write(&self.path, text).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("wrote config {}", self.path.display());
        Ok(())
    }
}

/// 序列化为两空格缩进并追加换行。
pub fn to_pretty_string(value: &Value) -> Result<String, ConfigError> {
    let mut text =
        serde_json::to_string_pretty(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

/// 取出（必要时创建）`map[key]` 处的子对象。
pub fn object_mut<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// 沿路径逐级取出（必要时创建）嵌套对象。
pub fn object_at<'a>(
    map: &'a mut Map<String, Value>,
    path: &[&str],
) -> &'a mut Map<String, Value> {
    path.iter().fold(map, |cur, key| object_mut(cur, key))
}
