//! Disk image file 磁盘镜像文件

use std::{
  fs::{File, OpenOptions},
  io,
  os::unix::fs::FileExt,
  path::Path,
};

use super::Disk;
use crate::{BSIZE, BlockId};

/// One device backed by an image file, block `n` at byte `n * BSIZE`
/// 由镜像文件承载的单个设备，块 `n` 位于偏移 `n * BSIZE`
pub struct FileDisk {
  file: File,
  dev: u32,
}

impl FileDisk {
  /// Open an existing image / 打开已有镜像
  pub fn open(path: impl AsRef<Path>, dev: u32) -> io::Result<Self> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(Self { file, dev })
  }

  /// Create (truncate) an image of `nblocks` zeroed blocks
  /// 创建（截断）含 `nblocks` 个零块的镜像
  pub fn create(path: impl AsRef<Path>, dev: u32, nblocks: u32) -> io::Result<Self> {
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(true)
      .open(path)?;
    file.set_len(nblocks as u64 * BSIZE as u64)?;
    Ok(Self { file, dev })
  }

  #[inline]
  pub fn dev(&self) -> u32 {
    self.dev
  }

  /// Flush to storage / 刷到存储
  pub fn sync(&self) -> io::Result<()> {
    self.file.sync_all()
  }

  fn offset(&self, id: BlockId) -> io::Result<u64> {
    if id.dev != self.dev {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no device {} (image is {})", id.dev, self.dev),
      ));
    }
    Ok(id.no as u64 * BSIZE as u64)
  }
}

impl Disk for FileDisk {
  fn read(&self, id: BlockId, data: &mut [u8]) -> io::Result<()> {
    self.file.read_exact_at(data, self.offset(id)?)
  }

  fn write(&self, id: BlockId, data: &[u8]) -> io::Result<()> {
    self.file.write_all_at(data, self.offset(id)?)
  }
}
