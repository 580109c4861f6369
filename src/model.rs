// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/model.rs - 推理引擎接口与检测结果定义
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

use serde::Serialize;

/// 推理引擎接口。
///
/// 引擎是外部协作方：接收归一化的 NCHW 张量，返回原始输出张量。
/// 解码器不持有引擎句柄，生命周期由调用方显式管理。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  fn run(&self, tensor: &[f32], width: u32, height: u32) -> Result<RawOutput, Self::Error>;
}

/// 引擎返回的原始输出张量。
///
/// 形状只在解码边界显式校验，此处不做任何假设：
/// 逻辑布局为 `(channels, candidates)` 平面排列，
/// 单类别模型的通道依次为 `[cx, cy, w, h, conf]`（模型空间像素单位）。
#[derive(Debug, Clone)]
pub struct RawOutput {
  pub data: Box<[f32]>,
  pub channels: usize,
  pub candidates: usize,
}

/// 单个检测结果，坐标为原图像素单位。
///
/// 模型空间的框只是解码过程的中间量，不会出现在这里。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
  pub x_center: f64,
  pub y_center: f64,
  pub width: f64,
  pub height: f64,
  pub confidence: f64,
}

/// 整体判定：单类别缺陷检测语义下，检出即 NG，无检出即 OK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
  Ok,
  Ng,
}

impl std::fmt::Display for Verdict {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Verdict::Ok => write!(f, "OK"),
      Verdict::Ng => write!(f, "NG"),
    }
  }
}

/// 去重后的检测集合，按置信度降序排列
#[derive(Debug, Clone, Serialize)]
pub struct DetectionSet {
  pub items: Vec<Detection>,
  pub verdict: Verdict,
}

impl DetectionSet {
  pub fn from_items(items: Vec<Detection>) -> Self {
    let verdict = if items.is_empty() {
      Verdict::Ok
    } else {
      Verdict::Ng
    };
    Self { items, verdict }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

mod decoder;
pub use self::decoder::{DEFAULT_CONF_THRESHOLD, DEFAULT_IOU_THRESHOLD, DecodeError, Decoder};
