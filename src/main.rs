// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::mpsc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mingjian::config::Config;
use mingjian::retention::RetentionWorker;
use mingjian::store::ArtifactStore;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();
  let args = args::Args::parse();

  let mut config = match &args.config {
    Some(path) => Config::load(path)?,
    None => Config::default(),
  };
  if let Some(dir) = args.captures_dir {
    config.captures_dir = dir;
  }
  if let Some(days) = args.retention_days {
    config.retention_days = days;
  }
  if let Some(secs) = args.scan_interval_secs {
    config.scan_interval_secs = secs;
  }

  println!("Mingjian 存档生命周期管理");
  println!("========================");
  println!("存档目录: {}", config.captures_dir.display());
  println!("保留天数: {}", config.retention_days);
  println!("扫描间隔: {} 秒", config.scan_interval_secs);
  println!();

  let store = ArtifactStore::open(&config.captures_dir)?;

  // 单次清理模式
  if args.cleanup_now {
    let report = store.remove_expired(config.max_age())?;
    println!("清理完成!");
    println!("已删除: {} 个", report.deleted.len());
    for name in &report.deleted {
      println!("  - {}", name);
    }
    if !report.failed.is_empty() {
      println!("删除失败: {} 个", report.failed.len());
      for failure in &report.failed {
        println!("  - {}: {}", failure.filename, failure.reason);
      }
    }
    return Ok(());
  }

  // 常驻模式：后台清理线程 + Ctrl-C 退出
  let handle = RetentionWorker::new(store, config.retention_policy()).spawn();

  let (exit_tx, exit_rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    let _ = exit_tx.send(());
  })?;

  println!("后台清理已启动, 按 Ctrl-C 退出");
  let _ = exit_rx.recv();
  info!("收到退出信号, 正在停止");
  handle.shutdown();
  println!("已退出");

  Ok(())
}
