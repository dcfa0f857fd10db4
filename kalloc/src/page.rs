//! Allocated page handle
//! 已分配页句柄

use std::{
  fmt::{Debug, Formatter, Result as FmtResult},
  marker::PhantomData,
  slice::{from_raw_parts, from_raw_parts_mut},
};

use crate::{Kalloc, PAGE_SIZE};

/// One allocated page, owned by the holder until passed back to
/// [`Kalloc::free`]. Not `Clone`: a page cannot be freed twice through its
/// handle.
/// 已分配的一页，归持有者所有直至交还 [`Kalloc::free`]。不可 Clone，
/// 句柄无法重复释放。
#[must_use = "dropping a Page leaks it, pass it to Kalloc::free"]
pub struct Page<'a> {
  ptr: *mut u8,
  _kalloc: PhantomData<&'a Kalloc>,
}

// SAFETY: the handle is the sole owner of the page memory.
// 安全：句柄独占该页内存。
unsafe impl Send for Page<'_> {}
unsafe impl Sync for Page<'_> {}

impl Page<'_> {
  #[inline(always)]
  pub(crate) fn new(ptr: *mut u8) -> Self {
    Self {
      ptr,
      _kalloc: PhantomData,
    }
  }

  /// Address (page identity) / 地址（页标识）
  #[inline(always)]
  pub fn addr(&self) -> usize {
    self.ptr as usize
  }

  #[inline(always)]
  pub fn as_slice(&self) -> &[u8] {
    unsafe { from_raw_parts(self.ptr, PAGE_SIZE) }
  }

  #[inline(always)]
  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { from_raw_parts_mut(self.ptr, PAGE_SIZE) }
  }

  /// Give up the handle, keep the address
  /// 放弃句柄，只保留地址
  #[inline(always)]
  pub fn into_raw(self) -> usize {
    self.addr()
  }
}

impl Debug for Page<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "Page({:#x})", self.addr())
  }
}
