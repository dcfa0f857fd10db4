//! Buffer handles / 缓冲句柄
//!
//! [`Buf`] owns the payload lock and one reference. [`Pin`] owns one
//! reference only. Both give the reference back on drop.
//! [`Buf`] 持有数据锁与一个引用，[`Pin`] 只持有一个引用。两者 drop 时归还引用。

use std::{fmt, mem::ManuallyDrop, sync::atomic::Ordering};

use klock::SleepGuard;

use crate::{Bcache, Block, BlockId, Disk, Result, SlotId};

/// Locked buffer / 持锁缓冲
///
/// Not `Send`: the payload lock belongs to the acquiring thread.
/// 非 `Send`：数据锁属于获取它的线程。
#[must_use]
pub struct Buf<'a, D: Disk> {
  cache: &'a Bcache<D>,
  id: BlockId,
  at: SlotId,
  guard: ManuallyDrop<SleepGuard<'a, Box<Block>>>,
}

impl<'a, D: Disk> Buf<'a, D> {
  pub(crate) fn new(
    cache: &'a Bcache<D>,
    id: BlockId,
    at: SlotId,
    guard: SleepGuard<'a, Box<Block>>,
  ) -> Self {
    Self {
      cache,
      id,
      at,
      guard: ManuallyDrop::new(guard),
    }
  }

  #[inline]
  pub fn id(&self) -> BlockId {
    self.id
  }

  #[inline]
  pub fn dev(&self) -> u32 {
    self.id.dev
  }

  #[inline]
  pub fn no(&self) -> u32 {
    self.id.no
  }

  #[inline]
  pub fn slot(&self) -> SlotId {
    self.at
  }

  #[inline]
  pub fn data(&self) -> &Block {
    &self.guard
  }

  #[inline]
  pub fn data_mut(&mut self) -> &mut Block {
    &mut self.guard
  }

  /// Payload holds the block's disk content / 数据已与磁盘内容一致
  #[inline]
  pub fn valid(&self) -> bool {
    self.cache.slot(self.at).valid.load(Ordering::Acquire)
  }

  /// Device operation in flight on this slot / 该槽正进行设备操作
  #[inline]
  pub fn disk_owned(&self) -> bool {
    self.cache.slot(self.at).disk.load(Ordering::Acquire)
  }

  /// Payload lock held by the calling thread / 调用线程持有数据锁
  #[inline]
  pub fn holding(&self) -> bool {
    self.guard.lock().holding()
  }

  /// See [`Bcache::write`]
  #[inline]
  pub fn write(&self) -> Result<()> {
    self.cache.write(self)
  }

  /// See [`Bcache::pin`]
  #[inline]
  pub fn pin(&self) -> Pin<'a, D> {
    self.cache.pin(self)
  }

  /// See [`Bcache::release`]
  #[inline]
  pub fn release(self) {}

  #[inline]
  pub(crate) fn cache(&self) -> &'a Bcache<D> {
    self.cache
  }
}

impl<D: Disk> Drop for Buf<'_, D> {
  fn drop(&mut self) {
    if !self.holding() {
      log::error!("brelse {}: buffer lock not held", self.id);
      panic!("brelse: buffer lock not held");
    }
    // Payload lock goes first, bucket lock after
    // 先放数据锁，再取桶锁
    unsafe { ManuallyDrop::drop(&mut self.guard) };
    self.cache.unref(self.at);
  }
}

impl<D: Disk> fmt::Debug for Buf<'_, D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Buf")
      .field("id", &self.id)
      .field("at", &self.at)
      .finish()
  }
}

/// Pin token: keeps a slot bound to its block / 固定令牌：保持槽与块的绑定
#[must_use]
pub struct Pin<'a, D: Disk> {
  cache: &'a Bcache<D>,
  id: BlockId,
  at: SlotId,
}

impl<'a, D: Disk> Pin<'a, D> {
  pub(crate) fn new(cache: &'a Bcache<D>, id: BlockId, at: SlotId) -> Self {
    Self { cache, id, at }
  }

  #[inline]
  pub fn id(&self) -> BlockId {
    self.id
  }

  #[inline]
  pub fn slot(&self) -> SlotId {
    self.at
  }

  /// Lock the pinned block again / 再次锁定被固定的块
  pub fn read(&self) -> Result<Buf<'a, D>> {
    self.cache.read(self.id.dev, self.id.no)
  }

  /// See [`Bcache::unpin`]
  #[inline]
  pub fn unpin(self) {}
}

impl<D: Disk> Drop for Pin<'_, D> {
  fn drop(&mut self) {
    self.cache.unref(self.at);
  }
}

impl<D: Disk> fmt::Debug for Pin<'_, D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pin")
      .field("id", &self.id)
      .field("at", &self.at)
      .finish()
  }
}
