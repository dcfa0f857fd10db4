//! Spin lock / 自旋锁
//!
//! Short-held mutual exclusion. Rescheduling stays disabled while the lock
//! is held, so the holder keeps its processor identity and must not block.
//! 短时互斥锁。持锁期间关闭调度，持有者保持处理器标识且不得阻塞。

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};

use crate::cpu::{self, Off};

pub struct SpinLock<T> {
  name: &'static str,
  inner: Mutex<T>,
}

impl<T> SpinLock<T> {
  #[inline]
  pub fn new(name: &'static str, val: T) -> Self {
    Self {
      name,
      inner: Mutex::new(val),
    }
  }

  /// Acquire, disabling rescheduling first / 先关闭调度再加锁
  #[inline]
  pub fn lock(&self) -> SpinGuard<'_, T> {
    let off = cpu::off();
    SpinGuard {
      guard: self.inner.lock(),
      off,
    }
  }

  #[inline]
  pub fn is_locked(&self) -> bool {
    self.inner.is_locked()
  }

  #[inline]
  pub fn name(&self) -> &'static str {
    self.name
  }

  #[inline]
  pub fn into_inner(self) -> T {
    self.inner.into_inner()
  }
}

/// Lock guard. Field order matters: the lock is released before
/// rescheduling is enabled again.
/// 锁守卫。字段顺序决定先释放锁，再恢复调度。
pub struct SpinGuard<'a, T> {
  guard: MutexGuard<'a, T>,
  off: Off,
}

impl<T> SpinGuard<'_, T> {
  /// Rescheduling-disabled token held by this guard / 守卫持有的关闭调度令牌
  #[inline(always)]
  pub fn off(&self) -> &Off {
    &self.off
  }
}

impl<T> Deref for SpinGuard<'_, T> {
  type Target = T;

  #[inline(always)]
  fn deref(&self) -> &T {
    &self.guard
  }
}

impl<T> DerefMut for SpinGuard<'_, T> {
  #[inline(always)]
  fn deref_mut(&mut self) -> &mut T {
    &mut self.guard
  }
}
