//! Cache configuration
//! 缓存配置

/// Source of release timestamps
/// 释放时间戳来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
  /// Logical counter, strictly increasing per release
  /// 逻辑计数，每次释放严格递增
  #[default]
  Tick,
  /// Coarse monotonic ms since cache creation, equal stamps fall back to slot order
  /// 自缓存创建起的粗粒度单调毫秒，时间戳相同时按槽顺序
  Coarse,
}

/// Cache configuration options
/// 缓存配置选项
#[derive(Debug, Clone, Copy)]
pub enum Conf {
  /// Number of hash buckets
  /// 哈希桶数量
  Buckets(usize),

  /// Buffer slots per bucket
  /// 每桶缓冲槽数量
  BucketSize(usize),

  /// Release timestamp source
  /// 释放时间戳来源
  Clock(Clock),
}

/// Parsed configuration
/// 解析后的配置
#[derive(Debug, Clone)]
pub struct Config {
  pub buckets: usize,
  pub bucket_size: usize,
  pub clock: Clock,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      buckets: default::BUCKETS,
      bucket_size: default::BUCKET_SIZE,
      clock: Clock::Tick,
    }
  }
}

impl From<&[Conf]> for Config {
  fn from(conf_li: &[Conf]) -> Self {
    let mut config = Self::default();
    for &conf in conf_li {
      match conf {
        Conf::Buckets(v) => {
          if v == 0 {
            log::warn!("Buckets 0 is not supported, using 1");
          }
          config.buckets = v.max(1);
        }
        Conf::BucketSize(v) => {
          if v == 0 {
            log::warn!("BucketSize 0 is not supported, using 1");
          }
          config.bucket_size = v.max(1);
        }
        Conf::Clock(v) => config.clock = v,
      }
    }
    config
  }
}

/// Default values
/// 默认值
pub mod default {
  /// Bucket count (prime spreads sequential block numbers)
  /// 桶数量（素数使连续块号分散）
  pub const BUCKETS: usize = 17;

  /// Slots per bucket
  /// 每桶槽数
  pub const BUCKET_SIZE: usize = 17;
}
