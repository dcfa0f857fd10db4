//! Allocator configuration
//! 分配器配置

/// Where the pages of the region start out
/// 区域内页面的初始归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spread {
  /// All pages on the initialising cpu, others steal
  /// 全部放在初始化所在 CPU，其余 CPU 靠窃取
  #[default]
  Boot,
  /// Page `i` goes to cpu `i % ncpu`
  /// 第 `i` 页归属 `i % ncpu` 号 CPU
  RoundRobin,
}

/// Allocator configuration options
/// 分配器配置选项
#[derive(Debug, Clone, Copy)]
pub enum Conf {
  /// Number of cpus (one shard each)
  /// CPU 数量（每个一个分片）
  Ncpu(usize),

  /// Initial page distribution
  /// 初始页面分布
  Spread(Spread),
}

/// Parsed configuration
/// 解析后的配置
#[derive(Debug, Clone)]
pub struct Config {
  pub ncpu: usize,
  pub spread: Spread,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      ncpu: default::NCPU,
      spread: Spread::Boot,
    }
  }
}

impl From<&[Conf]> for Config {
  fn from(conf_li: &[Conf]) -> Self {
    let mut config = Self::default();
    for &conf in conf_li {
      match conf {
        Conf::Ncpu(v) => {
          if v == 0 {
            log::warn!("Ncpu 0 is not supported, using 1");
          }
          config.ncpu = v.max(1);
        }
        Conf::Spread(v) => config.spread = v,
      }
    }
    config
  }
}

/// Default values
/// 默认值
pub mod default {
  /// Max cpus
  /// 最大 CPU 数
  pub const NCPU: usize = 8;
}
