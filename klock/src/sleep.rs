//! Sleep lock / 睡眠锁
//!
//! Long-held lock whose waiters are suspended on a condition variable
//! instead of spinning. The holder is recorded so callers can verify they
//! own the lock. No fairness among waiters.
//! 长时持有的锁，等待者挂起于条件变量而非自旋。记录持有者以便校验。
//! 等待者之间无公平性保证。

use std::{
  cell::UnsafeCell,
  marker::PhantomData,
  ops::{Deref, DerefMut},
  thread::{self, ThreadId},
};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result, cpu};

pub struct SleepLock<T> {
  name: &'static str,
  holder: Mutex<Option<ThreadId>>,
  cv: Condvar,
  data: UnsafeCell<T>,
}

// SAFETY: data is only reached through a SleepGuard, and at most one guard
// exists at a time (holder is Some while it lives).
// 安全：数据只能经 SleepGuard 访问，同一时刻至多一个守卫。
unsafe impl<T: Send> Send for SleepLock<T> {}
unsafe impl<T: Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
  pub fn new(name: &'static str, val: T) -> Self {
    Self {
      name,
      holder: Mutex::new(None),
      cv: Condvar::new(),
      data: UnsafeCell::new(val),
    }
  }

  /// Acquire, sleeping while another thread holds it
  /// 获取锁，被他人持有时睡眠等待
  ///
  /// # Panics
  /// - rescheduling disabled (a spin lock is held) / 关闭调度时（持有自旋锁）
  /// - already held by the calling thread / 调用者已持有
  pub fn lock(&self) -> SleepGuard<'_, T> {
    cpu::assert_can_sleep(self.name);
    let me = thread::current().id();
    let mut holder = self.holder.lock();
    while let Some(h) = *holder {
      if h == me {
        log::error!("sleep lock {} re-acquired by its holder", self.name);
        panic!("{}: acquire while holding", self.name);
      }
      self.cv.wait(&mut holder);
    }
    *holder = Some(me);
    SleepGuard {
      lock: self,
      _not_send: PhantomData,
    }
  }

  /// Acquire without waiting / 不等待地尝试获取
  pub fn try_lock(&self) -> Result<SleepGuard<'_, T>> {
    let mut holder = self.holder.lock();
    if holder.is_some() {
      return Err(Error::Locked);
    }
    *holder = Some(thread::current().id());
    Ok(SleepGuard {
      lock: self,
      _not_send: PhantomData,
    })
  }

  /// Is it held by the calling thread / 是否由调用线程持有
  #[inline]
  pub fn holding(&self) -> bool {
    *self.holder.lock() == Some(thread::current().id())
  }

  #[inline]
  pub fn is_locked(&self) -> bool {
    self.holder.lock().is_some()
  }

  fn unlock(&self) {
    *self.holder.lock() = None;
    self.cv.notify_one();
  }
}

/// Sleep lock guard, releases and wakes one waiter on drop
/// 睡眠锁守卫，Drop 时释放并唤醒一个等待者
pub struct SleepGuard<'a, T> {
  lock: &'a SleepLock<T>,
  _not_send: PhantomData<*const ()>,
}

impl<T> SleepGuard<'_, T> {
  #[inline(always)]
  pub fn lock(&self) -> &SleepLock<T> {
    self.lock
  }
}

impl<T> Deref for SleepGuard<'_, T> {
  type Target = T;

  #[inline(always)]
  fn deref(&self) -> &T {
    unsafe { &*self.lock.data.get() }
  }
}

impl<T> DerefMut for SleepGuard<'_, T> {
  #[inline(always)]
  fn deref_mut(&mut self) -> &mut T {
    unsafe { &mut *self.lock.data.get() }
  }
}

impl<T> Drop for SleepGuard<'_, T> {
  #[inline]
  fn drop(&mut self) {
    self.lock.unlock();
  }
}
