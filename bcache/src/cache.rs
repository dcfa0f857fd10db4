//! Bucketed buffer cache
//! 分桶缓冲缓存
//!
//! A block lives in bucket `no % buckets`. Each bucket has a spin lock over
//! slot metadata, each slot a sleep lock over its payload.
//! 块位于 `no % buckets` 号桶。桶自旋锁保护槽元数据，槽睡眠锁保护数据。
//!
//! ```text
//! get:     bucket lock -> unlock -> slot sleep lock
//! release: slot sleep lock -> unlock -> bucket lock
//! ```
//!
//! No thread holds a bucket lock and a sleep lock together, nor two bucket
//! locks.
//! 不会同时持有桶锁与睡眠锁，也不会同时持有两个桶锁。

use std::{
  ptr,
  sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use klock::{SleepLock, SpinLock};

use crate::{
  BSIZE, Block, BlockId, Buf, Clock, Conf, Config, Disk, Error, Pin, Result, SlotId,
  stat::{Counter, Stat},
};

/// Slot selection state, guarded by the bucket lock
/// 槽选择状态，由桶锁保护
#[derive(Default)]
struct Meta {
  /// None until first assigned / 首次分配前为 None
  key: Option<BlockId>,
  refcnt: u32,
  /// Last release time, meaningful at refcnt 0 / 最近释放时间，refcnt 为 0 时有效
  ts: u64,
}

pub(crate) struct Slot {
  /// Payload loaded from disk; cleared under the bucket lock on reuse
  /// 数据已从磁盘载入；复用时在桶锁下清除
  pub valid: AtomicBool,
  /// Device operation in flight / 设备操作进行中
  pub disk: AtomicBool,
  pub data: SleepLock<Box<Block>>,
}

struct Bucket {
  meta: SpinLock<Box<[Meta]>>,
  slots: Box<[Slot]>,
}

impl Bucket {
  fn new(size: usize) -> Self {
    Self {
      meta: SpinLock::new("bcache.bucket", (0..size).map(|_| Meta::default()).collect()),
      slots: (0..size)
        .map(|_| Slot {
          valid: AtomicBool::new(false),
          disk: AtomicBool::new(false),
          data: SleepLock::new("buffer", Box::new([0u8; BSIZE])),
        })
        .collect(),
    }
  }
}

/// Buffer cache 缓冲缓存
pub struct Bcache<D: Disk> {
  disk: D,
  buckets: Box<[Bucket]>,
  clock: Clock,
  tick: AtomicU64,
  epoch: coarsetime::Instant,
  counter: Counter,
}

impl<D: Disk> Bcache<D> {
  pub fn new(disk: D, conf: &[Conf]) -> Self {
    let Config {
      buckets,
      bucket_size,
      clock,
    } = conf.into();
    log::debug!("bcache {buckets}x{bucket_size} slots, clock {clock:?}");
    Self {
      disk,
      buckets: (0..buckets).map(|_| Bucket::new(bucket_size)).collect(),
      clock,
      tick: AtomicU64::new(0),
      epoch: coarsetime::Instant::now(),
      counter: Counter::default(),
    }
  }

  /// Locked buffer holding valid data of block `no` on `dev`
  /// 返回持锁且数据有效的 `dev` 设备 `no` 号块
  ///
  /// Reads the device only when the block is not cached.
  /// 仅在未缓存时读设备。
  pub fn read(&self, dev: u32, no: u32) -> Result<Buf<'_, D>> {
    let mut buf = self.get(BlockId::new(dev, no))?;
    let slot = self.slot(buf.slot());
    if !slot.valid.load(Ordering::Acquire) {
      slot.disk.store(true, Ordering::Release);
      let r = self.disk.read(buf.id(), buf.data_mut());
      slot.disk.store(false, Ordering::Release);
      Counter::inc(&self.counter.read);
      r?;
      slot.valid.store(true, Ordering::Release);
    }
    Ok(buf)
  }

  /// Write the payload back to disk
  /// 将数据写回磁盘
  ///
  /// # Panics
  /// If the calling thread does not hold the buffer of this cache.
  /// 调用线程未持有本缓存的该缓冲时 panic。
  pub fn write(&self, buf: &Buf<'_, D>) -> Result<()> {
    if !ptr::eq(buf.cache(), self) || !buf.holding() {
      log::error!("bwrite {}: buffer lock not held", buf.id());
      panic!("bwrite: buffer lock not held");
    }
    let slot = self.slot(buf.slot());
    slot.disk.store(true, Ordering::Release);
    let r = self.disk.write(buf.id(), buf.data());
    slot.disk.store(false, Ordering::Release);
    Counter::inc(&self.counter.write);
    Ok(r?)
  }

  /// Release the buffer (same as dropping it)
  /// 释放缓冲（等同于 drop）
  #[inline]
  pub fn release(&self, buf: Buf<'_, D>) {
    drop(buf);
  }

  /// Keep the slot from reuse without holding its payload lock
  /// 不持有数据锁而阻止槽被复用
  ///
  /// # Panics
  /// If the buffer belongs to another cache.
  /// 缓冲属于其他缓存时 panic。
  pub fn pin<'a>(&'a self, buf: &Buf<'a, D>) -> Pin<'a, D> {
    if !ptr::eq(buf.cache(), self) {
      log::error!("bpin {}: buffer of another cache", buf.id());
      panic!("bpin: foreign buffer");
    }
    let at = buf.slot();
    self.buckets[at.bucket].meta.lock()[at.index].refcnt += 1;
    Pin::new(self, buf.id(), at)
  }

  /// Undo a [`Bcache::pin`] (same as dropping the token)
  /// 撤销 [`Bcache::pin`]（等同于 drop 令牌）
  #[inline]
  pub fn unpin(&self, pin: Pin<'_, D>) {
    drop(pin);
  }

  /// Look up or recycle a slot, then sleep on its lock
  /// 查找或回收槽位，再睡眠等待其锁
  fn get(&self, id: BlockId) -> Result<Buf<'_, D>> {
    let b = id.no as usize % self.buckets.len();
    let bucket = &self.buckets[b];

    let index = {
      let mut meta = bucket.meta.lock();
      if let Some(i) = meta.iter().position(|m| m.key == Some(id)) {
        meta[i].refcnt += 1;
        Counter::inc(&self.counter.hit);
        i
      } else {
        // Strictly smaller wins: equal stamps keep the lowest index
        // 严格更小才替换：时间戳相同保留最小下标
        let mut lru: Option<usize> = None;
        for (i, m) in meta.iter().enumerate() {
          if m.refcnt == 0 && lru.is_none_or(|j| m.ts < meta[j].ts) {
            lru = Some(i);
          }
        }
        let Some(i) = lru else {
          Counter::inc(&self.counter.exhausted);
          log::warn!("bcache: no buffer for {id} in bucket {b}");
          return Err(Error::NoBuf(b));
        };
        let m = &mut meta[i];
        if let Some(old) = m.key {
          log::debug!("bcache: evict {old} for {id} at {b}/{i}");
        }
        m.key = Some(id);
        m.refcnt = 1;
        bucket.slots[i].valid.store(false, Ordering::Release);
        Counter::inc(&self.counter.miss);
        i
      }
    };

    let guard = bucket.slots[index].data.lock();
    Ok(Buf::new(self, id, SlotId { bucket: b, index }, guard))
  }

  /// Drop one reference, stamp the time when it reaches zero
  /// 减少一个引用，归零时记录时间
  pub(crate) fn unref(&self, at: SlotId) {
    let mut meta = self.buckets[at.bucket].meta.lock();
    let m = &mut meta[at.index];
    debug_assert!(m.refcnt > 0, "bcache: refcnt underflow");
    m.refcnt -= 1;
    if m.refcnt == 0 {
      m.ts = self.now();
    }
  }

  #[inline]
  pub(crate) fn slot(&self, at: SlotId) -> &Slot {
    &self.buckets[at.bucket].slots[at.index]
  }

  fn now(&self) -> u64 {
    match self.clock {
      Clock::Tick => self.tick.fetch_add(1, Ordering::Relaxed) + 1,
      // +1 keeps released slots behind never used ones (stamp 0)
      Clock::Coarse => self.epoch.elapsed().as_millis() + 1,
    }
  }

  /// Reference count of a cached block, None if not cached
  /// 已缓存块的引用计数，未缓存返回 None
  pub fn refcnt(&self, dev: u32, no: u32) -> Option<u32> {
    let id = BlockId::new(dev, no);
    let bucket = &self.buckets[no as usize % self.buckets.len()];
    let meta = bucket.meta.lock();
    meta.iter().find(|m| m.key == Some(id)).map(|m| m.refcnt)
  }

  #[inline]
  pub fn disk(&self) -> &D {
    &self.disk
  }

  #[inline]
  pub fn buckets(&self) -> usize {
    self.buckets.len()
  }

  #[inline]
  pub fn bucket_size(&self) -> usize {
    self.buckets[0].slots.len()
  }

  pub fn stat(&self) -> Stat {
    self.counter.get()
  }
}
