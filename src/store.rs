// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/store.rs - 存档目录索引与生命周期操作
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

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::timestamp::{self, ArtifactKind};

/// 目录中的一个存档文件。
///
/// 时间戳只由文件名承载；目录里没有任何其他索引或元数据，
/// 文件的修改时间与名字不一致时以名字为准。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub taken_at: NaiveDateTime,
  pub kind: ArtifactKind,
  pub path: PathBuf,
}

impl Artifact {
  /// 规范文件名（由时间戳与种类重新生成，与 `path` 的文件名一致）
  pub fn filename(&self) -> String {
    timestamp::format_name(self.taken_at, self.kind)
  }
}

/// 时间戳相同的原始/标注存档对
#[derive(Debug, Clone, Serialize)]
pub struct Pair {
  pub taken_at: NaiveDateTime,
  pub original: Artifact,
  pub annotated: Artifact,
}

/// 一次目录扫描的结果，两类各自按时间戳降序
#[derive(Debug, Default, Serialize)]
pub struct Listing {
  pub originals: Vec<Artifact>,
  pub annotated: Vec<Artifact>,
}

/// 单个存档删除失败的记录
#[derive(Debug, Serialize)]
pub struct CleanupFailure {
  pub filename: String,
  pub reason: String,
}

/// 一次清理的结果报告
#[derive(Debug, Default, Serialize)]
pub struct CleanupReport {
  pub deleted: Vec<String>,
  pub failed: Vec<CleanupFailure>,
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("无效的存档文件名: {0}")]
  InvalidName(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] io::Error),
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
}

/// 平面存档目录上的无状态索引。
///
/// 每次查询都重新扫描目录：存档可能被捕获流程、清理线程或
/// 人工操作在两次查询之间创建或删除，不能缓存任何视图。
#[derive(Debug, Clone)]
pub struct ArtifactStore {
  dir: PathBuf,
}

impl ArtifactStore {
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let dir = dir.into();
    fs::create_dir_all(&dir)?;
    Ok(Self { dir })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// 扫描目录，按文件名分类全部存档；解析失败的条目直接忽略
  pub fn scan(&self) -> Result<Listing, StoreError> {
    let mut listing = Listing::default();

    for entry in fs::read_dir(&self.dir)? {
      let entry = entry?;
      let name = entry.file_name();
      let Some(name) = name.to_str() else {
        continue;
      };
      let Some((taken_at, kind)) = timestamp::parse(name) else {
        continue;
      };
      let artifact = Artifact {
        taken_at,
        kind,
        path: entry.path(),
      };
      match kind {
        ArtifactKind::Original => listing.originals.push(artifact),
        ArtifactKind::Annotated => listing.annotated.push(artifact),
      }
    }

    listing.originals.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    listing.annotated.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    Ok(listing)
  }

  /// 指定种类中时间戳最大的存档
  pub fn latest(&self, kind: ArtifactKind) -> Result<Option<Artifact>, StoreError> {
    let listing = self.scan()?;
    Ok(match kind {
      ArtifactKind::Original => listing.originals.into_iter().next(),
      ArtifactKind::Annotated => listing.annotated.into_iter().next(),
    })
  }

  /// 按时间戳内连接原始与标注存档，时间戳降序。
  ///
  /// 落单的存档不出现在结果里，但仍能通过 [`scan`](Self::scan) 看到。
  pub fn paired(&self) -> Result<Vec<Pair>, StoreError> {
    let listing = self.scan()?;
    let mut annotated: HashMap<NaiveDateTime, Artifact> = listing
      .annotated
      .into_iter()
      .map(|a| (a.taken_at, a))
      .collect();

    let mut pairs = Vec::new();
    for original in listing.originals {
      if let Some(annotated) = annotated.remove(&original.taken_at) {
        pairs.push(Pair {
          taken_at: original.taken_at,
          original,
          annotated,
        });
      }
    }
    Ok(pairs)
  }

  /// 时间戳严格早于 cutoff 的全部存档（不限种类）
  pub fn older_than(&self, cutoff: NaiveDateTime) -> Result<Vec<Artifact>, StoreError> {
    let listing = self.scan()?;
    Ok(
      listing
        .originals
        .into_iter()
        .chain(listing.annotated)
        .filter(|a| a.taken_at < cutoff)
        .collect(),
    )
  }

  /// 以规范文件名写入一张 PNG 存档
  pub fn persist(
    &self,
    image: &RgbImage,
    taken_at: NaiveDateTime,
    kind: ArtifactKind,
  ) -> Result<Artifact, StoreError> {
    let name = timestamp::format_name(taken_at, kind);
    let path = self.dir.join(&name);
    image.save(&path)?;
    info!("已保存存档: {}", path.display());
    Ok(Artifact {
      taken_at,
      kind,
      path,
    })
  }

  /// 按文件名读取存档内容。
  ///
  /// 文件名在碰任何存储之前先做严格校验；清理线程并发删除
  /// 导致的文件消失是预期情况，按"不存在"返回而不是错误。
  pub fn fetch(&self, filename: &str) -> Result<Option<Vec<u8>>, StoreError> {
    if timestamp::parse(filename).is_none() {
      return Err(StoreError::InvalidName(filename.to_string()));
    }

    match fs::read(self.dir.join(filename)) {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!("存档不存在: {}", filename);
        Ok(None)
      }
      Err(e) => Err(e.into()),
    }
  }

  /// 删除超过保留窗口的存档。
  ///
  /// 自动清理线程与手动清理共用这一个实现，保证两条触发路径
  /// 的行为一致。
  pub fn remove_expired(&self, max_age: Duration) -> Result<CleanupReport, StoreError> {
    let age = TimeDelta::milliseconds(max_age.as_millis().min(i64::MAX as u128) as i64);
    let cutoff = Local::now().naive_local() - age;
    self.remove_older_than(cutoff)
  }

  /// 删除时间戳严格早于 cutoff 的存档，逐个尽力而为：
  /// 单个删除失败记入报告，不中断剩余的删除。
  pub fn remove_older_than(&self, cutoff: NaiveDateTime) -> Result<CleanupReport, StoreError> {
    let expired = self.older_than(cutoff)?;
    let mut report = CleanupReport::default();

    for artifact in expired {
      let name = artifact.filename();
      match fs::remove_file(&artifact.path) {
        Ok(()) => {
          info!("已删除过期存档: {}", name);
          report.deleted.push(name);
        }
        Err(e) => {
          warn!("删除过期存档失败 {}: {}", name, e);
          report.failed.push(CleanupFailure {
            filename: name,
            reason: e.to_string(),
          });
        }
      }
    }
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{NaiveDate, NaiveTime};
  use image::Rgb;

  fn instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDateTime::new(
      NaiveDate::from_ymd_opt(y, mo, d).unwrap(),
      NaiveTime::from_hms_milli_opt(h, mi, s, ms).unwrap(),
    )
  }

  fn seed(store: &ArtifactStore, t: NaiveDateTime, kind: ArtifactKind) -> PathBuf {
    let path = store.dir().join(timestamp::format_name(t, kind));
    fs::write(&path, b"png-bytes").unwrap();
    path
  }

  #[test]
  fn scan_ignores_unrelated_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    seed(&store, instant(2024, 1, 1, 12, 0, 0, 500), ArtifactKind::Original);
    fs::write(dir.path().join("readme.txt"), b"x").unwrap();
    fs::write(dir.path().join("capture_bad.png"), b"x").unwrap();

    let listing = store.scan().unwrap();
    assert_eq!(listing.originals.len(), 1);
    assert!(listing.annotated.is_empty());
  }

  #[test]
  fn latest_picks_maximum_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    seed(&store, instant(2024, 1, 1, 12, 0, 0, 100), ArtifactKind::Original);
    seed(&store, instant(2024, 1, 2, 8, 30, 0, 0), ArtifactKind::Original);
    seed(&store, instant(2024, 1, 1, 23, 59, 59, 999), ArtifactKind::Original);

    let latest = store.latest(ArtifactKind::Original).unwrap().unwrap();
    assert_eq!(latest.taken_at, instant(2024, 1, 2, 8, 30, 0, 0));
    assert!(store.latest(ArtifactKind::Annotated).unwrap().is_none());
  }

  #[test]
  fn paired_joins_on_equal_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let t = instant(2024, 1, 1, 12, 0, 0, 500);
    let original_path = seed(&store, t, ArtifactKind::Original);
    seed(&store, t, ArtifactKind::Annotated);
    // 落单的原始存档
    seed(&store, instant(2024, 1, 1, 13, 0, 0, 0), ArtifactKind::Original);

    let pairs = store.paired().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].taken_at, t);

    // 删除原始成员后不再成对，但标注存档仍可被扫描到
    fs::remove_file(original_path).unwrap();
    assert!(store.paired().unwrap().is_empty());
    let listing = store.scan().unwrap();
    assert_eq!(listing.annotated.len(), 1);
  }

  #[test]
  fn paired_is_ordered_by_descending_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    for t in [
      instant(2024, 1, 1, 10, 0, 0, 0),
      instant(2024, 1, 3, 10, 0, 0, 0),
      instant(2024, 1, 2, 10, 0, 0, 0),
    ] {
      seed(&store, t, ArtifactKind::Original);
      seed(&store, t, ArtifactKind::Annotated);
    }

    let pairs = store.paired().unwrap();
    assert_eq!(pairs.len(), 3);
    assert!(pairs[0].taken_at > pairs[1].taken_at);
    assert!(pairs[1].taken_at > pairs[2].taken_at);
  }

  #[test]
  fn older_than_is_strictly_less() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let cutoff = instant(2024, 1, 2, 0, 0, 0, 0);
    seed(&store, instant(2024, 1, 1, 23, 59, 59, 999), ArtifactKind::Original);
    seed(&store, cutoff, ArtifactKind::Original);
    seed(&store, instant(2024, 1, 2, 0, 0, 0, 1), ArtifactKind::Annotated);

    let expired = store.older_than(cutoff).unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(
      expired[0].taken_at,
      instant(2024, 1, 1, 23, 59, 59, 999)
    );
  }

  #[test]
  fn persist_writes_canonical_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let t = instant(2024, 1, 1, 12, 0, 0, 500);
    let image = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));

    let artifact = store.persist(&image, t, ArtifactKind::Original).unwrap();
    assert_eq!(artifact.filename(), "capture_20240101_120000_500.png");
    assert!(artifact.path.exists());

    let annotated = store.persist(&image, t, ArtifactKind::Annotated).unwrap();
    assert_eq!(
      annotated.filename(),
      "capture_20240101_120000_500_detection.png"
    );
    assert_eq!(store.paired().unwrap().len(), 1);
  }

  #[test]
  fn fetch_rejects_invalid_name_before_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let err = store.fetch("../../etc/passwd");
    assert!(matches!(err, Err(StoreError::InvalidName(_))));
    let err = store.fetch("capture_20240101_120000_500.png.bak");
    assert!(matches!(err, Err(StoreError::InvalidName(_))));
  }

  #[test]
  fn fetch_of_vanished_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    // 合法名字但文件不存在，等价于读与删除赛跑后的状态
    let bytes = store.fetch("capture_20240101_120000_500.png").unwrap();
    assert!(bytes.is_none());

    let t = instant(2024, 1, 1, 12, 0, 0, 500);
    seed(&store, t, ArtifactKind::Original);
    let bytes = store.fetch("capture_20240101_120000_500.png").unwrap();
    assert_eq!(bytes.as_deref(), Some(b"png-bytes".as_slice()));
  }

  #[test]
  fn cleanup_removes_expired_pairs_and_reports_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let old = instant(2024, 1, 1, 12, 0, 0, 500);
    let fresh = instant(2024, 6, 1, 12, 0, 0, 0);
    seed(&store, old, ArtifactKind::Original);
    seed(&store, old, ArtifactKind::Annotated);
    seed(&store, fresh, ArtifactKind::Original);

    let report = store
      .remove_older_than(instant(2024, 3, 1, 0, 0, 0, 0))
      .unwrap();
    assert_eq!(report.deleted.len(), 2);
    assert!(report.failed.is_empty());
    assert!(report.deleted.contains(&"capture_20240101_120000_500.png".to_string()));
    assert!(
      report
        .deleted
        .contains(&"capture_20240101_120000_500_detection.png".to_string())
    );

    // 再跑一遍应当无事可做
    let report = store
      .remove_older_than(instant(2024, 3, 1, 0, 0, 0, 0))
      .unwrap();
    assert!(report.deleted.is_empty());
    assert!(report.failed.is_empty());

    let listing = store.scan().unwrap();
    assert_eq!(listing.originals.len(), 1);
    assert_eq!(listing.originals[0].taken_at, fresh);
  }

  #[test]
  fn cleanup_failure_is_isolated_per_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let a = instant(2024, 1, 1, 12, 0, 0, 100);
    let b = instant(2024, 1, 1, 12, 0, 0, 200);
    seed(&store, a, ArtifactKind::Original);
    // 用同名目录制造无法以 remove_file 删除的条目
    fs::create_dir(store.dir().join(timestamp::format_name(b, ArtifactKind::Original))).unwrap();

    let report = store
      .remove_older_than(instant(2024, 2, 1, 0, 0, 0, 0))
      .unwrap();
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
      report.failed[0].filename,
      timestamp::format_name(b, ArtifactKind::Original)
    );
  }
}
