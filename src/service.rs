// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/service.rs - 捕获、检测与存档的编排层
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

use std::time::Duration;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::draw;
use crate::frame::Frame;
use crate::input::{Camera, CaptureError};
use crate::letterbox::{self, PreprocessPlan};
use crate::model::{DecodeError, Decoder, DetectionSet, Engine};
use crate::retention::DEFAULT_MAX_AGE;
use crate::store::{Artifact, ArtifactStore, CleanupReport, Listing, Pair, StoreError};
use crate::timestamp::ArtifactKind;

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("捕获失败: {0}")]
  Capture(#[from] CaptureError),
  #[error("推理失败: {0}")]
  Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("解码失败: {0}")]
  Decode(#[from] DecodeError),
  #[error("存档失败: {0}")]
  Store(#[from] StoreError),
}

/// 标注存档的写入结果。
///
/// 原始存档一旦落盘就不回滚：标注写失败只降级为部分成功，
/// 调用方拿到失败原因自行决定后续。
#[derive(Debug)]
pub enum AnnotatedOutcome {
  Saved(Artifact),
  Failed(StoreError),
}

/// 一次完整检测的结果
#[derive(Debug)]
pub struct InspectOutcome {
  pub original: Artifact,
  pub annotated: AnnotatedOutcome,
  pub detections: DetectionSet,
}

/// 存档检索请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchQuery {
  LatestOriginal,
  LatestAnnotated,
  Paired,
  All,
}

/// 存档检索结果
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResult {
  Latest(Option<Artifact>),
  Pairs(Vec<Pair>),
  Listing(Listing),
}

/// 检测流水线的编排服务。
///
/// 相机与推理引擎都是注入的协作方；服务本身只持有目录句柄
/// 与解码参数，天然可在线程间克隆目录视图。
pub struct InspectionService<C: Camera, E: Engine> {
  camera: C,
  engine: E,
  store: ArtifactStore,
  decoder: Decoder,
}

impl<C: Camera, E: Engine> InspectionService<C, E> {
  pub fn new(camera: C, engine: E, store: ArtifactStore, decoder: Decoder) -> Self {
    Self {
      camera,
      engine,
      store,
      decoder,
    }
  }

  pub fn store(&self) -> &ArtifactStore {
    &self.store
  }

  /// 触发一次捕获并保存原始存档
  pub fn capture(&mut self) -> Result<(Frame, Artifact), ServiceError> {
    let frame = self.camera.trigger()?;
    info!(
      "捕获完成: {}x{} @ {}",
      frame.width(),
      frame.height(),
      frame.taken_at()
    );
    let artifact = self
      .store
      .persist(frame.image(), frame.taken_at(), ArtifactKind::Original)?;
    Ok((frame, artifact))
  }

  /// 对帧运行完整的检测流程：几何变换、推理、解码、标注。
  ///
  /// 返回检测集合与画好检测框的标注图像，不落盘。
  pub fn run_detection(
    &self,
    frame: &Frame,
    conf_threshold: Option<f64>,
  ) -> Result<(DetectionSet, RgbImage), ServiceError> {
    let plan = PreprocessPlan::new(frame.width(), frame.height());
    let canvas = letterbox::apply(frame.image(), &plan);
    let tensor = letterbox::to_tensor(&canvas);

    let raw = self
      .engine
      .run(&tensor, canvas.width(), canvas.height())
      .map_err(|e| ServiceError::Engine(Box::new(e)))?;

    let mut decoder = self.decoder;
    if let Some(conf) = conf_threshold {
      decoder.conf_threshold = conf;
    }
    let detections = decoder.decode(&raw, &plan)?;
    info!("检测完成: {} ({} 个缺陷)", detections.verdict, detections.len());

    let mut annotated = frame.image().clone();
    draw::draw_detections(&mut annotated, &detections);
    Ok((detections, annotated))
  }

  /// 触发捕获、运行检测并保存原始与标注两份存档。
  ///
  /// 原始存档先于标注存档落盘；标注写失败不影响已保存的
  /// 原始存档与检测结果。
  pub fn capture_and_detect(
    &mut self,
    conf_threshold: Option<f64>,
  ) -> Result<InspectOutcome, ServiceError> {
    let (frame, original) = self.capture()?;
    let (detections, annotated_image) = self.run_detection(&frame, conf_threshold)?;

    let annotated = match self
      .store
      .persist(&annotated_image, frame.taken_at(), ArtifactKind::Annotated)
    {
      Ok(artifact) => AnnotatedOutcome::Saved(artifact),
      Err(e) => {
        warn!("标注存档写入失败, 原始存档保留: {}", e);
        AnnotatedOutcome::Failed(e)
      }
    };

    Ok(InspectOutcome {
      original,
      annotated,
      detections,
    })
  }

  /// 检索存档，每次都重新扫描目录
  pub fn search(&self, query: SearchQuery) -> Result<SearchResult, ServiceError> {
    Ok(match query {
      SearchQuery::LatestOriginal => {
        SearchResult::Latest(self.store.latest(ArtifactKind::Original)?)
      }
      SearchQuery::LatestAnnotated => {
        SearchResult::Latest(self.store.latest(ArtifactKind::Annotated)?)
      }
      SearchQuery::Paired => SearchResult::Pairs(self.store.paired()?),
      SearchQuery::All => SearchResult::Listing(self.store.scan()?),
    })
  }

  /// 手动触发一次清理，走与定时清理相同的实现；
  /// 不指定窗口时使用默认保留窗口
  pub fn cleanup(&self, max_age: Option<Duration>) -> Result<CleanupReport, ServiceError> {
    Ok(
      self
        .store
        .remove_expired(max_age.unwrap_or(DEFAULT_MAX_AGE))?,
    )
  }

  /// 按文件名读取存档内容
  pub fn fetch_artifact(&self, filename: &str) -> Result<Option<Vec<u8>>, ServiceError> {
    Ok(self.store.fetch(filename)?)
  }
}
