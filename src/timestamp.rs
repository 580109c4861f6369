// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/timestamp.rs - 存档文件名时间戳编解码
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

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

/// 存档种类：原始图像或标注后的检测结果图像
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactKind {
  Original,
  Annotated,
}

const NAME_PREFIX: &str = "capture_";
const NAME_SUFFIX: &str = ".png";
const ANNOTATED_TAG: &str = "_detection";

// 时间戳段固定为 `YYYYMMDD_HHMMSS_mmm`，共 19 个字符
const STAMP_LEN: usize = 19;

/// 将时间渲染为 `YYYYMMDD_HHMMSS_mmm`（毫秒截断而非四舍五入）
pub fn encode(t: NaiveDateTime) -> String {
  let millis = (t.nanosecond() / 1_000_000).min(999);
  format!(
    "{:04}{:02}{:02}_{:02}{:02}{:02}_{:03}",
    t.year(),
    t.month(),
    t.day(),
    t.hour(),
    t.minute(),
    t.second(),
    millis,
  )
}

/// 由时间与种类生成规范存档文件名
///
/// 该命名方案同时是与外部扫描工具的接口约定，
/// 分隔符与零填充位宽都不可改动。
pub fn format_name(t: NaiveDateTime, kind: ArtifactKind) -> String {
  match kind {
    ArtifactKind::Original => format!("{}{}{}", NAME_PREFIX, encode(t), NAME_SUFFIX),
    ArtifactKind::Annotated => {
      format!("{}{}{}{}", NAME_PREFIX, encode(t), ANNOTATED_TAG, NAME_SUFFIX)
    }
  }
}

/// 严格解析存档文件名，返回时间与种类
///
/// 任何不完整匹配（多余前后缀、位数不对、非法日期）都返回 `None`，
/// 表示"不是存档文件"，而不是错误。
pub fn parse(filename: &str) -> Option<(NaiveDateTime, ArtifactKind)> {
  let rest = filename.strip_prefix(NAME_PREFIX)?;
  let rest = rest.strip_suffix(NAME_SUFFIX)?;
  let (stamp, kind) = match rest.strip_suffix(ANNOTATED_TAG) {
    Some(stamp) => (stamp, ArtifactKind::Annotated),
    None => (rest, ArtifactKind::Original),
  };

  let bytes = stamp.as_bytes();
  if bytes.len() != STAMP_LEN || bytes[8] != b'_' || bytes[15] != b'_' {
    return None;
  }
  if !bytes
    .iter()
    .enumerate()
    .all(|(i, b)| i == 8 || i == 15 || b.is_ascii_digit())
  {
    return None;
  }

  let year: i32 = stamp[0..4].parse().ok()?;
  let month: u32 = stamp[4..6].parse().ok()?;
  let day: u32 = stamp[6..8].parse().ok()?;
  let hour: u32 = stamp[9..11].parse().ok()?;
  let minute: u32 = stamp[11..13].parse().ok()?;
  let second: u32 = stamp[13..15].parse().ok()?;
  let millis: u32 = stamp[16..19].parse().ok()?;

  let date = NaiveDate::from_ymd_opt(year, month, day)?;
  let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
  Some((NaiveDateTime::new(date, time), kind))
}

/// 截断到毫秒精度，使捕获时刻与文件名编码往返一致
pub fn truncate_to_millis(t: NaiveDateTime) -> NaiveDateTime {
  let nanos = t.nanosecond() / 1_000_000 * 1_000_000;
  t.with_nanosecond(nanos).unwrap_or(t)
}
