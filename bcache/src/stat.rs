//! Cache counters / 缓存计数

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Snapshot of cache counters / 缓存计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
  /// Lookups that found the block cached / 命中次数
  pub hit: u64,
  /// Lookups that recycled a slot / 回收槽位的次数
  pub miss: u64,
  /// Device reads / 设备读次数
  pub read: u64,
  /// Device writes / 设备写次数
  pub write: u64,
  /// Lookups that found every slot referenced / 桶满失败次数
  pub exhausted: u64,
}

#[derive(Default)]
pub(crate) struct Counter {
  pub hit: AtomicU64,
  pub miss: AtomicU64,
  pub read: AtomicU64,
  pub write: AtomicU64,
  pub exhausted: AtomicU64,
}

impl Counter {
  #[inline(always)]
  pub fn inc(n: &AtomicU64) {
    n.fetch_add(1, Relaxed);
  }

  pub fn get(&self) -> Stat {
    Stat {
      hit: self.hit.load(Relaxed),
      miss: self.miss.load(Relaxed),
      read: self.read.load(Relaxed),
      write: self.write.load(Relaxed),
      exhausted: self.exhausted.load(Relaxed),
    }
  }
}
