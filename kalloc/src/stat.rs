//! Allocator counters / 分配器计数

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Snapshot of allocator counters / 分配器计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
  /// Successful allocations / 成功分配次数
  pub alloc: u64,
  /// Frees / 释放次数
  pub free: u64,
  /// Allocations served from another cpu / 从其他 CPU 窃取的分配次数
  pub steal: u64,
  /// Allocations that found no page / 无页可分配的次数
  pub fail: u64,
}

#[derive(Default)]
pub(crate) struct Counter {
  pub alloc: AtomicU64,
  pub free: AtomicU64,
  pub steal: AtomicU64,
  pub fail: AtomicU64,
}

impl Counter {
  #[inline(always)]
  pub fn inc(n: &AtomicU64) {
    n.fetch_add(1, Relaxed);
  }

  pub fn get(&self) -> Stat {
    Stat {
      alloc: self.alloc.load(Relaxed),
      free: self.free.load(Relaxed),
      steal: self.steal.load(Relaxed),
      fail: self.fail.load(Relaxed),
    }
  }
}
