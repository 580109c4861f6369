// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/letterbox.rs - 保持长宽比的图像预处理几何变换
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

use image::{Rgb, RgbImage, imageops};

/// 模型输入宽度
pub const MODEL_INPUT_W: u32 = 640;
/// 模型输入高度
pub const MODEL_INPUT_H: u32 = 640;
/// 画布填充灰度值，必须与参考推理流水线完全一致
pub const CANVAS_FILL: u8 = 114;

/// 一帧的 letterbox 预处理参数。
///
/// 每帧推导一次后不可变；`scale = min(target_w/src_w, target_h/src_h)`，
/// 缩放后的图像在目标画布中居中。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessPlan {
  pub scale: f64,
  pub pad_x: u32,
  pub pad_y: u32,
  pub target_w: u32,
  pub target_h: u32,
}

impl PreprocessPlan {
  /// 以默认 640x640 模型输入尺寸计算预处理参数
  pub fn new(src_w: u32, src_h: u32) -> Self {
    Self::with_target(src_w, src_h, MODEL_INPUT_W, MODEL_INPUT_H)
  }

  pub fn with_target(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> Self {
    let scale = f64::min(
      target_w as f64 / src_w as f64,
      target_h as f64 / src_h as f64,
    );
    let (new_w, new_h) = scaled_dims(src_w, src_h, scale);
    // 前侧留白向下取整，余数落在后侧，保证 pad + new + pad' == target
    Self {
      scale,
      pad_x: (target_w - new_w) / 2,
      pad_y: (target_h - new_h) / 2,
      target_w,
      target_h,
    }
  }

  /// 模型空间坐标映射回原图坐标。
  ///
  /// 必须先减去留白再除以缩放比例，顺序颠倒会得到偏移的结果。
  pub fn to_source_space(&self, x_model: f64, y_model: f64) -> (f64, f64) {
    (
      (x_model - self.pad_x as f64) / self.scale,
      (y_model - self.pad_y as f64) / self.scale,
    )
  }
}

fn scaled_dims(src_w: u32, src_h: u32, scale: f64) -> (u32, u32) {
  let new_w = ((src_w as f64 * scale).round() as u32).max(1);
  let new_h = ((src_h as f64 * scale).round() as u32).max(1);
  (new_w, new_h)
}

/// 按预处理参数生成 letterbox 画布：等比缩放后居中，余白填充中灰
pub fn apply(image: &RgbImage, plan: &PreprocessPlan) -> RgbImage {
  let (new_w, new_h) = scaled_dims(image.width(), image.height(), plan.scale);
  let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);

  let mut canvas = RgbImage::from_pixel(plan.target_w, plan.target_h, Rgb([CANVAS_FILL; 3]));
  imageops::overlay(&mut canvas, &resized, plan.pad_x as i64, plan.pad_y as i64);
  canvas
}

/// 画布转为模型输入张量：NCHW 平面排列，[0, 1] 归一化
pub fn to_tensor(image: &RgbImage) -> Box<[f32]> {
  let (w, h) = image.dimensions();
  let plane = (w * h) as usize;
  let mut data = vec![0.0f32; plane * 3];

  for (x, y, pixel) in image.enumerate_pixels() {
    let idx = (y * w + x) as usize;
    for c in 0..3 {
      data[c * plane + idx] = pixel[c] as f32 / 255.0;
    }
  }

  data.into_boxed_slice()
}
