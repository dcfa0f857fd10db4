//! In-memory disk 内存磁盘

use std::{
  collections::HashMap,
  io,
  sync::atomic::{AtomicU64, Ordering::Relaxed},
};

use parking_lot::Mutex;

use super::Disk;
use crate::{BSIZE, Block, BlockId};

/// Sparse in-memory device set, unwritten blocks read as zeros. Counts
/// device operations.
/// 稀疏内存设备集合，未写过的块读出全零。统计设备操作次数。
#[derive(Default)]
pub struct MemDisk {
  blocks: Mutex<HashMap<BlockId, Box<Block>>>,
  reads: AtomicU64,
  writes: AtomicU64,
}

impl MemDisk {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store block content directly, bypassing counters
  /// 直接写入块内容，不计数
  pub fn put(&self, id: BlockId, data: &[u8]) {
    let mut block = Box::new([0u8; BSIZE]);
    let n = data.len().min(BSIZE);
    block[..n].copy_from_slice(&data[..n]);
    self.blocks.lock().insert(id, block);
  }

  /// Block content, None if never written / 块内容，未写过返回 None
  pub fn get(&self, id: BlockId) -> Option<Box<Block>> {
    self.blocks.lock().get(&id).cloned()
  }

  #[inline]
  pub fn reads(&self) -> u64 {
    self.reads.load(Relaxed)
  }

  #[inline]
  pub fn writes(&self) -> u64 {
    self.writes.load(Relaxed)
  }
}

impl Disk for MemDisk {
  fn read(&self, id: BlockId, data: &mut [u8]) -> io::Result<()> {
    self.reads.fetch_add(1, Relaxed);
    match self.blocks.lock().get(&id) {
      Some(block) => data.copy_from_slice(&block[..data.len()]),
      None => data.fill(0),
    }
    Ok(())
  }

  fn write(&self, id: BlockId, data: &[u8]) -> io::Result<()> {
    self.writes.fetch_add(1, Relaxed);
    let mut blocks = self.blocks.lock();
    let block = blocks.entry(id).or_insert_with(|| Box::new([0u8; BSIZE]));
    block[..data.len()].copy_from_slice(data);
    Ok(())
  }
}
