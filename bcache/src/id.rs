//! Block & slot identity 块与槽标识

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Disk block address: device + block number
/// 磁盘块地址：设备号 + 块号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
  pub dev: u32,
  pub no: u32,
}

impl BlockId {
  #[inline]
  pub const fn new(dev: u32, no: u32) -> Self {
    Self { dev, no }
  }
}

impl Display for BlockId {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{}:{}", self.dev, self.no)
  }
}

/// Buffer slot position: bucket + index inside bucket
/// 缓冲槽位置：桶号 + 桶内下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
  pub bucket: usize,
  pub index: usize,
}
