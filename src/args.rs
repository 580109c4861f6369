// 该文件是 Mingjian （明鉴） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

/// Mingjian 存档生命周期管理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// JSON 配置文件路径（缺省时使用内置默认值）
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 存档目录，覆盖配置文件
  #[arg(long, value_name = "DIR")]
  pub captures_dir: Option<PathBuf>,

  /// 存档保留天数，覆盖配置文件
  #[arg(long, value_name = "DAYS")]
  pub retention_days: Option<u32>,

  /// 清理扫描间隔（秒），覆盖配置文件
  #[arg(long, value_name = "SECS")]
  pub scan_interval_secs: Option<u64>,

  /// 立即执行一次清理后退出，不启动后台线程
  #[arg(long)]
  pub cleanup_now: bool,
}
