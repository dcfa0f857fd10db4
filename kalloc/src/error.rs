//! Error types for kalloc
//! kalloc 错误类型

use std::alloc::LayoutError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("out of memory: no free page on any cpu")]
  OutOfMemory,

  #[error("invalid layout: {0}")]
  InvalidLayout(#[from] LayoutError),

  #[error("alloc failed")]
  AllocFailed,

  #[error("empty region: {0:#x}..{1:#x}")]
  EmptyRegion(usize, usize),

  #[error("overflow: {0} pages")]
  Overflow(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
