// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/model/decoder.rs - 原始输出张量解码与重复抑制
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

use thiserror::Error;
use tracing::debug;

use crate::letterbox::PreprocessPlan;
use crate::model::{Detection, DetectionSet, RawOutput};

/// 单类别模型的输出通道数：cx, cy, w, h, conf
const BOX_CHANNELS: usize = 5;

/// 默认置信度阈值
pub const DEFAULT_CONF_THRESHOLD: f64 = 0.5;
/// 默认 NMS IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.45;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("模型输出形状不匹配: 期望 {expected} 通道, 实际 {channels} 通道 ({len} 个元素, {candidates} 个候选)")]
  ShapeMismatch {
    expected: usize,
    channels: usize,
    candidates: usize,
    len: usize,
  },
}

/// 检测解码器：置信度过滤、贪心重复抑制、坐标反变换
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
  pub conf_threshold: f64,
  pub iou_threshold: f64,
}

impl Default for Decoder {
  fn default() -> Self {
    Self {
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
    }
  }
}

/// 模型空间的候选框，解码过程的中间量
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
  cx: f32,
  cy: f32,
  w: f32,
  h: f32,
  conf: f32,
}

impl Candidate {
  fn corners(&self) -> [f32; 4] {
    [
      self.cx - self.w / 2.0,
      self.cy - self.h / 2.0,
      self.cx + self.w / 2.0,
      self.cy + self.h / 2.0,
    ]
  }
}

impl Decoder {
  /// 解码原始输出张量，返回原图坐标的检测集合。
  ///
  /// 空输出得到空集合与 OK 判定；形状不符是引擎契约违背，
  /// 直接报错且不重试。
  pub fn decode(
    &self,
    raw: &RawOutput,
    plan: &PreprocessPlan,
  ) -> Result<DetectionSet, DecodeError> {
    if raw.channels != BOX_CHANNELS || raw.data.len() != raw.channels * raw.candidates {
      return Err(DecodeError::ShapeMismatch {
        expected: BOX_CHANNELS,
        channels: raw.channels,
        candidates: raw.candidates,
        len: raw.data.len(),
      });
    }

    let n = raw.candidates;
    let mut candidates = Vec::new();
    for i in 0..n {
      let conf = raw.data[4 * n + i];
      if (conf as f64) < self.conf_threshold {
        continue;
      }
      candidates.push(Candidate {
        cx: raw.data[i],
        cy: raw.data[n + i],
        w: raw.data[2 * n + i],
        h: raw.data[3 * n + i],
        conf,
      });
    }
    debug!("置信度过滤后剩余 {} 个候选框", candidates.len());

    let kept = nms(candidates, self.iou_threshold as f32);
    debug!("重复抑制后剩余 {} 个检测框", kept.len());

    let items = kept
      .into_iter()
      .map(|c| {
        let (x_center, y_center) = plan.to_source_space(c.cx as f64, c.cy as f64);
        Detection {
          x_center,
          y_center,
          width: c.w as f64 / plan.scale,
          height: c.h as f64 / plan.scale,
          confidence: c.conf as f64,
        }
      })
      .collect();

    Ok(DetectionSet::from_items(items))
  }
}

/// 贪心非极大值抑制。
///
/// 排序是稳定的，置信度相同时保持输入顺序，
/// 因此固定输入必得固定输出。
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
  candidates.sort_by(|a, b| {
    b.conf
      .partial_cmp(&a.conf)
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut kept = Vec::new();
  while !candidates.is_empty() {
    let best = candidates.remove(0);
    let best_box = best.corners();
    candidates.retain(|other| iou(&best_box, &other.corners()) <= iou_threshold);
    kept.push(best);
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
