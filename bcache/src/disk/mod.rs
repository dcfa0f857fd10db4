//! Synchronous block device / 同步块设备
//!
//! Fills or flushes one `BSIZE` payload for a block. The cache calls it
//! while holding the buffer's sleep lock and no spin lock.
//! 为一个块读入或写出 `BSIZE` 字节。缓存调用时持有缓冲睡眠锁，不持有自旋锁。

mod mem;
#[cfg(unix)]
mod file;

#[cfg(unix)]
pub use file::FileDisk;
pub use mem::MemDisk;

use std::io;

use crate::BlockId;

pub trait Disk: Send + Sync {
  /// Read block `id` into `data` (`BSIZE` bytes) / 读取块到 `data`
  fn read(&self, id: BlockId, data: &mut [u8]) -> io::Result<()>;

  /// Write `data` (`BSIZE` bytes) to block `id` / 将 `data` 写入块
  fn write(&self, id: BlockId, data: &[u8]) -> io::Result<()>;
}

impl<D: Disk + ?Sized> Disk for &D {
  #[inline]
  fn read(&self, id: BlockId, data: &mut [u8]) -> io::Result<()> {
    (**self).read(id, data)
  }

  #[inline]
  fn write(&self, id: BlockId, data: &[u8]) -> io::Result<()> {
    (**self).write(id, data)
  }
}
