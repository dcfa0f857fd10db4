#![cfg_attr(docsrs, feature(doc_cfg))]

//! Disk block cache / 磁盘块缓存
//!
//! Keeps recently used blocks in memory. Blocks hash into buckets by block
//! number; each bucket holds a fixed set of slots. A slot referenced by a
//! [`Buf`] or [`Pin`] is never recycled; among the rest the least recently
//! released one is reused first.
//! 在内存中保留最近使用的块。块按块号哈希到桶，每桶有固定数量的槽。
//! 被 [`Buf`] 或 [`Pin`] 引用的槽不会被回收，其余槽按最久未释放优先复用。
//!
//! ```
//! use bcache::{Bcache, MemDisk};
//!
//! let cache = Bcache::new(MemDisk::new(), &[]);
//! let mut buf = cache.read(1, 7).unwrap();
//! buf.data_mut()[0] = 42;
//! buf.write().unwrap();
//! drop(buf);
//! assert_eq!(cache.disk().get(bcache::BlockId::new(1, 7)).unwrap()[0], 42);
//! ```

mod buf;
mod cache;
mod conf;
mod disk;
mod error;
mod id;
mod stat;

pub use buf::{Buf, Pin};
pub use cache::Bcache;
pub use conf::{Clock, Conf, Config, default};
#[cfg(unix)]
pub use disk::FileDisk;
pub use disk::{Disk, MemDisk};
pub use error::{Error, Result};
pub use id::{BlockId, SlotId};
pub use stat::Stat;

/// Block size 1KB / 块大小
pub const BSIZE: usize = 1024;

/// Block payload / 块数据
pub type Block = [u8; BSIZE];
