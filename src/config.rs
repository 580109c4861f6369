// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/config.rs - JSON 配置文件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::{DEFAULT_CONF_THRESHOLD, DEFAULT_IOU_THRESHOLD, Decoder};
use crate::retention::RetentionPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("解析配置失败: {0}")]
  Parse(#[from] serde_json::Error),
}

/// 运行配置，缺省字段取默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// 存档目录
  pub captures_dir: PathBuf,
  /// 检测置信度阈值
  pub conf_threshold: f64,
  /// 重复抑制 IoU 阈值
  pub nms_threshold: f64,
  /// 相机捕获超时（秒）
  pub capture_timeout_secs: u64,
  /// 存档保留天数
  pub retention_days: u32,
  /// 清理扫描间隔（秒）
  pub scan_interval_secs: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      captures_dir: PathBuf::from("captures"),
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      nms_threshold: DEFAULT_IOU_THRESHOLD,
      capture_timeout_secs: 5,
      retention_days: 7,
      scan_interval_secs: 3600,
    }
  }
}

impl Config {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    info!("已加载配置: {}", path.display());
    Ok(config)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(self)?;
    fs::write(path.as_ref(), content)?;
    Ok(())
  }

  pub fn decoder(&self) -> Decoder {
    Decoder {
      conf_threshold: self.conf_threshold,
      iou_threshold: self.nms_threshold,
    }
  }

  pub fn max_age(&self) -> Duration {
    Duration::from_secs(u64::from(self.retention_days) * 24 * 3600)
  }

  pub fn retention_policy(&self) -> RetentionPolicy {
    RetentionPolicy {
      max_age: self.max_age(),
      scan_interval: Duration::from_secs(self.scan_interval_secs),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_fall_back_to_defaults() {
    let config: Config = serde_json::from_str(r#"{"retention_days": 3}"#).unwrap();
    assert_eq!(config.retention_days, 3);
    assert_eq!(config.captures_dir, PathBuf::from("captures"));
    assert!((config.conf_threshold - 0.5).abs() < 1e-9);
    assert_eq!(config.scan_interval_secs, 3600);
  }

  #[test]
  fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = Config::default();
    config.retention_days = 14;
    config.conf_threshold = 0.6;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.retention_days, 14);
    assert!((loaded.conf_threshold - 0.6).abs() < 1e-9);
    assert_eq!(
      loaded.max_age(),
      Duration::from_secs(14 * 24 * 3600)
    );
  }

  #[test]
  fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{not json").unwrap();
    assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
  }
}
