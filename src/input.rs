// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/input.rs - 软触发相机接口
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

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use image::ImageReader;
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;

/// 默认捕获超时预算
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum CaptureError {
  #[error("相机捕获超时 ({0:?})")]
  Timeout(Duration),
  #[error("相机设备错误: {0}")]
  Device(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Image(#[from] image::ImageError),
}

/// 软触发相机接口。
///
/// 物理相机驱动是外部协作方；实现方负责在 [`CAPTURE_TIMEOUT`]
/// 内返回帧或报告 [`CaptureError::Timeout`]。超时向调用方如实上报，
/// 核心不做自动重试。帧的捕获时刻在此处赋值，且只赋值一次。
pub trait Camera {
  fn trigger(&mut self) -> Result<Frame, CaptureError>;
}

/// 从图像文件读取帧的相机实现，用于离线回放与测试
pub struct ImageFileCamera {
  path: PathBuf,
}

impl ImageFileCamera {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Camera for ImageFileCamera {
  fn trigger(&mut self) -> Result<Frame, CaptureError> {
    debug!("从文件读取帧: {}", self.path.display());
    let image = ImageReader::open(&self.path)?.decode()?;
    Ok(Frame::new(image.into(), Local::now().naive_local()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn image_file_camera_stamps_capture_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])).save(&path).unwrap();

    let before = Local::now().naive_local();
    let mut camera = ImageFileCamera::new(&path);
    let frame = camera.trigger().unwrap();
    let after = Local::now().naive_local();

    assert_eq!((frame.width(), frame.height()), (8, 6));
    // 截断到毫秒后仍应落在触发前后的窗口内
    assert!(frame.taken_at() <= after);
    assert!(frame.taken_at() >= crate::timestamp::truncate_to_millis(before));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let mut camera = ImageFileCamera::new("/nonexistent/still.png");
    assert!(matches!(camera.trigger(), Err(CaptureError::Io(_))));
  }
}
