// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/draw.rs - 检测结果标注绘制
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

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::model::{Detection, DetectionSet};

// 标注常量
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // NG 用红色
const BOX_THICKNESS: i64 = 2;

/// 在原图上绘制全部检测框
pub fn draw_detections(image: &mut RgbImage, result: &DetectionSet) {
  for detection in &result.items {
    draw_box(image, detection);
  }
}

fn draw_box(image: &mut RgbImage, detection: &Detection) {
  let (w, h) = (image.width() as i64, image.height() as i64);

  let mut x_min = (detection.x_center - detection.width / 2.0).floor() as i64;
  let mut y_min = (detection.y_center - detection.height / 2.0).floor() as i64;
  let mut x_max = (detection.x_center + detection.width / 2.0).ceil() as i64;
  let mut y_max = (detection.y_center + detection.height / 2.0).ceil() as i64;

  // 裁剪到图像范围内
  x_min = x_min.clamp(0, w - 1);
  y_min = y_min.clamp(0, h - 1);
  x_max = x_max.clamp(0, w - 1);
  y_max = y_max.clamp(0, h - 1);

  if x_min >= x_max || y_min >= y_max {
    return;
  }

  // 向内收缩绘制两圈，得到 2 像素粗的边框
  for t in 0..BOX_THICKNESS {
    let rect_w = x_max - x_min + 1 - 2 * t;
    let rect_h = y_max - y_min + 1 - 2 * t;
    if rect_w < 1 || rect_h < 1 {
      break;
    }
    let rect = Rect::at((x_min + t) as i32, (y_min + t) as i32)
      .of_size(rect_w as u32, rect_h as u32);
    draw_hollow_rect_mut(image, rect, Rgb(BOX_COLOR));
  }
}
