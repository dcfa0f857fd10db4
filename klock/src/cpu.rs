//! Processor identity & rescheduling control / 处理器标识与调度控制
//!
//! One thread stands for one processor. The identity is only readable
//! through an [`Off`] guard, i.e. while rescheduling is disabled, so it
//! cannot change between reading it and using it.
//! 一个线程代表一个处理器。标识只能通过 [`Off`] 读取（即关闭调度期间），
//! 保证读取与使用之间不会变化。

use std::{cell::Cell, marker::PhantomData};

thread_local! {
  static ID: Cell<usize> = const { Cell::new(0) };
  static NOFF: Cell<u32> = const { Cell::new(0) };
}

/// Bind current thread to processor `id` / 将当前线程绑定到处理器 `id`
///
/// Unbound threads run as processor 0.
/// 未绑定的线程视为 0 号处理器。
///
/// # Panics
/// If rescheduling is disabled on this thread.
/// 当前线程已关闭调度时 panic。
pub fn bind(id: usize) {
  let noff = NOFF.get();
  if noff != 0 {
    log::error!("cpu bind {id} with rescheduling disabled (noff {noff})");
    panic!("cpu::bind: rescheduling disabled");
  }
  ID.set(id);
}

/// Nesting depth of [`off`] on this thread / 当前线程 [`off`] 的嵌套深度
#[inline(always)]
pub fn noff() -> u32 {
  NOFF.get()
}

/// Panic if the current thread may not block / 当前线程不可阻塞时 panic
pub fn assert_can_sleep(what: &str) {
  let noff = NOFF.get();
  if noff != 0 {
    log::error!("{what}: sleep with rescheduling disabled (noff {noff})");
    panic!("{what}: sleep with rescheduling disabled");
  }
}

/// Disable rescheduling (push off) / 关闭调度（嵌套计数 +1）
#[inline]
pub fn off() -> Off {
  NOFF.set(NOFF.get() + 1);
  Off {
    _not_send: PhantomData,
  }
}

/// Rescheduling-disabled guard, pops off on drop
/// 关闭调度守卫，Drop 时恢复（嵌套计数 -1）
#[must_use]
pub struct Off {
  _not_send: PhantomData<*const ()>,
}

impl Off {
  /// Current processor id / 当前处理器编号
  #[inline(always)]
  pub fn id(&self) -> usize {
    ID.get()
  }
}

impl Drop for Off {
  #[inline]
  fn drop(&mut self) {
    let n = NOFF.get();
    debug_assert!(n > 0, "pop_off underflow");
    NOFF.set(n - 1);
  }
}
