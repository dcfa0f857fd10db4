//! Managed memory region
//! 受管内存区域
//!
//! A page-aligned byte range carved into `PAGE_SIZE` pages. Either owned
//! (allocated here, freed on drop) or adopted from a caller-provided range.
//! 按页对齐的字节区间，切分为 `PAGE_SIZE` 页。可自行分配（Drop 时释放），
//! 也可接管调用者提供的区间。

use std::{
  alloc::{Layout, alloc, dealloc},
  fmt::{Debug, Formatter, Result as FmtResult},
  ptr::NonNull,
};

use crate::{Error, PAGE_SIZE, Result};

const PAGE_MASK: usize = PAGE_SIZE - 1;

pub struct Region {
  base: NonNull<u8>,
  npages: usize,
  owned: Option<Layout>,
}

// SAFETY: Region only hands out page pointers; exclusive access to each
// page is arbitrated by the allocator.
// 安全：Region 只提供页指针，每页的独占访问由分配器仲裁。
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
  /// Allocate an owned region of `npages` pages
  /// 分配 `npages` 页的自有区域
  pub fn alloc(npages: usize) -> Result<Self> {
    if npages == 0 {
      return Err(Error::EmptyRegion(0, 0));
    }
    let size = npages.checked_mul(PAGE_SIZE).ok_or(Error::Overflow(npages))?;
    let lo = Layout::from_size_align(size, PAGE_SIZE)?;
    let ptr = unsafe { alloc(lo) };
    let base = NonNull::new(ptr).ok_or(Error::AllocFailed)?;
    Ok(Self {
      base,
      npages,
      owned: Some(lo),
    })
  }

  /// Adopt `[start, end)`: start is rounded up to a page boundary, pages are
  /// carved while a whole page still fits before `end`.
  /// 接管 `[start, end)`：起点向上取整到页边界，只切分完整的页。
  ///
  /// # Safety
  /// The range must be valid, writable and unused by anything else for the
  /// lifetime of the region.
  /// 区间在 Region 生命周期内必须有效、可写且不被他人使用。
  pub unsafe fn from_range(start: usize, end: usize) -> Result<Self> {
    let first = match start.checked_add(PAGE_MASK) {
      Some(v) => v & !PAGE_MASK,
      None => return Err(Error::EmptyRegion(start, end)),
    };
    let npages = end.saturating_sub(first) / PAGE_SIZE;
    match NonNull::new(first as *mut u8) {
      Some(base) if npages > 0 => Ok(Self {
        base,
        npages,
        owned: None,
      }),
      _ => Err(Error::EmptyRegion(start, end)),
    }
  }

  #[inline(always)]
  pub fn start(&self) -> usize {
    self.base.as_ptr() as usize
  }

  /// First address past the last page / 最后一页之后的地址
  #[inline(always)]
  pub fn end(&self) -> usize {
    self.start() + self.npages * PAGE_SIZE
  }

  #[inline(always)]
  pub fn npages(&self) -> usize {
    self.npages
  }

  /// Page index of `addr`, None if unaligned or outside
  /// 地址对应的页号，未对齐或越界返回 None
  #[inline]
  pub fn index(&self, addr: usize) -> Option<usize> {
    if addr & PAGE_MASK != 0 || addr < self.start() || addr >= self.end() {
      return None;
    }
    Some((addr - self.start()) / PAGE_SIZE)
  }

  #[inline(always)]
  pub(crate) fn page_ptr(&self, idx: usize) -> NonNull<u8> {
    debug_assert!(idx < self.npages);
    unsafe { self.base.add(idx * PAGE_SIZE) }
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    if let Some(lo) = self.owned {
      unsafe { dealloc(self.base.as_ptr(), lo) }
    }
  }
}

impl Debug for Region {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Region")
      .field("start", &format_args!("{:#x}", self.start()))
      .field("npages", &self.npages)
      .field("owned", &self.owned.is_some())
      .finish()
  }
}
