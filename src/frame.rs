// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/frame.rs - 捕获帧定义
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

use chrono::NaiveDateTime;
use image::RgbImage;

use crate::timestamp;

/// 一次捕获产生的帧：RGB 像素数据加上捕获时刻。
///
/// 捕获时刻在构造时截断到毫秒并且此后不再重新计算，
/// 它就是该帧派生出的所有存档文件的时间戳。
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  taken_at: NaiveDateTime,
}

impl Frame {
  pub fn new(image: RgbImage, taken_at: NaiveDateTime) -> Self {
    Self {
      image,
      taken_at: timestamp::truncate_to_millis(taken_at),
    }
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn taken_at(&self) -> NaiveDateTime {
    self.taken_at
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}
