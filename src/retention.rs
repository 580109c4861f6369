// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/retention.rs - 后台保留清理线程
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

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::store::ArtifactStore;

/// 默认保留窗口：7 天
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);
/// 默认扫描间隔：1 小时
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(3600);

/// 保留策略：超过 `max_age` 的存档每隔 `scan_interval` 被清理一次
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
  pub max_age: Duration,
  pub scan_interval: Duration,
}

impl Default for RetentionPolicy {
  fn default() -> Self {
    Self {
      max_age: DEFAULT_MAX_AGE,
      scan_interval: DEFAULT_SCAN_INTERVAL,
    }
  }
}

/// 周期清理线程。
///
/// 线程在间隔等待上监听停止信号，所以即使间隔是一小时，
/// 停止请求也能立刻唤醒它。清理失败只记录日志，线程继续运行。
pub struct RetentionWorker {
  store: ArtifactStore,
  policy: RetentionPolicy,
}

/// 正在运行的清理线程句柄
pub struct RetentionHandle {
  stop: mpsc::Sender<()>,
  thread: JoinHandle<()>,
}

impl RetentionWorker {
  pub fn new(store: ArtifactStore, policy: RetentionPolicy) -> Self {
    Self { store, policy }
  }

  /// 启动后台线程，返回可用于停止的句柄
  pub fn spawn(self) -> RetentionHandle {
    let (stop_tx, stop_rx) = mpsc::channel();
    let thread = thread::spawn(move || self.run_loop(stop_rx));
    RetentionHandle {
      stop: stop_tx,
      thread,
    }
  }

  fn run_loop(self, stop: mpsc::Receiver<()>) {
    info!(
      "保留清理线程启动: 保留 {:?}, 间隔 {:?}",
      self.policy.max_age, self.policy.scan_interval
    );
    loop {
      match stop.recv_timeout(self.policy.scan_interval) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
          info!("保留清理线程退出");
          return;
        }
        Err(RecvTimeoutError::Timeout) => {}
      }

      match self.store.remove_expired(self.policy.max_age) {
        Ok(report) => {
          if !report.deleted.is_empty() || !report.failed.is_empty() {
            info!(
              "定时清理完成: 删除 {} 个, 失败 {} 个",
              report.deleted.len(),
              report.failed.len()
            );
          }
        }
        Err(e) => error!("定时清理失败: {}", e),
      }
    }
  }
}

impl RetentionHandle {
  /// 通知线程停止并等待其退出
  pub fn shutdown(self) {
    // 线程已退出时发送失败是正常的
    let _ = self.stop.send(());
    if self.thread.join().is_err() {
      error!("保留清理线程异常终止");
    }
  }
}
