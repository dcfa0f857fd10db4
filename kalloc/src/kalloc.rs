//! Per-cpu page allocator
//! 每 CPU 页分配器
//!
//! ```text
//! alloc():
//!   1. pop local shard (rescheduling off, local lock only)
//!   2. steal: scan other shards in index order, one lock at a time
//!   3. none anywhere -> Error::OutOfMemory
//! free(page):
//!   check address -> fill junk -> push local shard
//! ```

use std::{
  ptr::write_bytes,
  sync::atomic::{AtomicBool, Ordering},
};

use crossbeam_utils::CachePadded;
use klock::{SpinLock, cpu::{self, Off}};

use crate::{
  ALLOC_JUNK, Conf, Config, Error, FREE_JUNK, PAGE_SIZE, Page, Region, Result, Spread,
  stat::{Counter, Stat},
};

/// Free page indices of one cpu / 单个 CPU 的空闲页号栈
type Shard = CachePadded<SpinLock<Vec<usize>>>;

pub struct Kalloc {
  region: Region,
  shards: Box<[Shard]>,
  /// true while the page sits in a free list / 页位于空闲链表时为 true
  is_free: Box<[AtomicBool]>,
  counter: Counter,
}

impl Kalloc {
  /// Carve `region` into pages and free each one
  /// 将区域切分为页并逐页释放
  ///
  /// # Panics
  /// With [`Spread::Boot`], if the calling cpu id is not below `ncpu`.
  /// 使用 [`Spread::Boot`] 时，调用者 CPU 编号不小于 `ncpu` 则 panic。
  pub fn new(region: Region, conf: &[Conf]) -> Self {
    let Config { ncpu, spread } = conf.into();
    let npages = region.npages();

    let me = Self {
      shards: (0..ncpu)
        .map(|_| CachePadded::new(SpinLock::new("kmem", Vec::new())))
        .collect(),
      is_free: (0..npages).map(|_| AtomicBool::new(false)).collect(),
      counter: Counter::default(),
      region,
    };

    for idx in 0..npages {
      let to = match spread {
        Spread::Boot => None,
        Spread::RoundRobin => Some(idx % ncpu),
      };
      me.put(idx, to);
    }

    log::debug!(
      "kalloc {:?}: {npages} pages on {ncpu} cpus ({spread:?})",
      me.region
    );
    me
  }

  /// Allocate one page, filled with [`ALLOC_JUNK`]
  /// 分配一页，内容填充为 [`ALLOC_JUNK`]
  pub fn alloc(&self) -> Result<Page<'_>> {
    let (id, local) = {
      let off = cpu::off();
      let id = self.cpu(&off);
      (id, self.shards[id].lock().pop())
    };

    let idx = match local {
      Some(idx) => idx,
      None => match self.steal(id) {
        Some(idx) => idx,
        None => {
          Counter::inc(&self.counter.fail);
          log::warn!("cpu {id}: out of memory");
          return Err(Error::OutOfMemory);
        }
      },
    };

    if !self.is_free[idx].swap(false, Ordering::AcqRel) {
      log::error!("kalloc: page {idx} allocated twice");
      panic!("kalloc: page {idx} not free");
    }
    self.fill(idx, ALLOC_JUNK);
    Counter::inc(&self.counter.alloc);
    Ok(Page::new(self.region.page_ptr(idx).as_ptr()))
  }

  /// Return a page to the calling cpu's free list
  /// 将页归还到调用者 CPU 的空闲链表
  ///
  /// # Panics
  /// Unaligned or foreign address, double free.
  /// 地址未对齐或不属于本区域、重复释放。
  pub fn free(&self, page: Page<'_>) {
    let addr = page.into_raw();
    let Some(idx) = self.region.index(addr) else {
      log::error!("kfree {addr:#x}: outside {:?} or unaligned", self.region);
      panic!("kfree: bad address {addr:#x}");
    };
    self.put(idx, None);
    Counter::inc(&self.counter.free);
  }

  /// Rebuild a handle from [`Page::into_raw`]; [`Kalloc::free`] validates it
  /// 从 [`Page::into_raw`] 重建句柄；由 [`Kalloc::free`] 校验
  ///
  /// # Safety
  /// The caller must own the page at `addr` and stop using it after free.
  /// 调用者必须拥有该页，且释放后不再使用。
  #[inline]
  pub unsafe fn page_from_raw(&self, addr: usize) -> Page<'_> {
    Page::new(addr as *mut u8)
  }

  /// Push onto shard `to`, or the calling cpu's shard when None
  /// 压入 `to` 分片，None 时压入调用者 CPU 的分片
  fn put(&self, idx: usize, to: Option<usize>) {
    if self.is_free[idx].swap(true, Ordering::AcqRel) {
      log::error!("kfree: page {idx} already free");
      panic!("kfree: double free of page {idx}");
    }
    self.fill(idx, FREE_JUNK);

    match to {
      Some(id) => self.shards[id].lock().push(idx),
      None => {
        let off = cpu::off();
        let id = self.cpu(&off);
        self.shards[id].lock().push(idx);
      }
    }
  }

  /// Never holds two shard locks at once / 同一时刻至多持有一个分片锁
  fn steal(&self, id: usize) -> Option<usize> {
    for (i, shard) in self.shards.iter().enumerate() {
      if i == id {
        continue;
      }
      let popped = shard.lock().pop();
      if let Some(idx) = popped {
        Counter::inc(&self.counter.steal);
        log::debug!("cpu {id} stole page {idx} from {} {i}", shard.name());
        return Some(idx);
      }
    }
    None
  }

  #[inline]
  fn fill(&self, idx: usize, junk: u8) {
    unsafe { write_bytes(self.region.page_ptr(idx).as_ptr(), junk, PAGE_SIZE) }
  }

  fn cpu(&self, off: &Off) -> usize {
    let id = off.id();
    if id >= self.shards.len() {
      log::error!("kalloc: cpu {id} >= ncpu {}", self.shards.len());
      panic!("kalloc: cpu {id} out of range");
    }
    id
  }

  #[inline]
  pub fn region(&self) -> &Region {
    &self.region
  }

  #[inline]
  pub fn npages(&self) -> usize {
    self.region.npages()
  }

  #[inline]
  pub fn ncpu(&self) -> usize {
    self.shards.len()
  }

  /// Free pages on `cpu` / `cpu` 上的空闲页数
  pub fn shard_len(&self, cpu: usize) -> usize {
    self.shards[cpu].lock().len()
  }

  /// Free pages over all cpus, one shard lock at a time
  /// 所有 CPU 的空闲页总数，逐个分片加锁
  pub fn free_pages(&self) -> usize {
    self.shards.iter().map(|s| s.lock().len()).sum()
  }

  pub fn stat(&self) -> Stat {
    self.counter.get()
  }
}
