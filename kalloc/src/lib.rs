#![cfg_attr(docsrs, feature(doc_cfg))]

//! Physical page allocator with per-cpu free lists
//! 每 CPU 空闲链表的物理页分配器
//!
//! Each cpu owns a free list behind its own spin lock. Allocation and free
//! touch only the local list; an empty local list falls back to stealing
//! one page from another cpu.
//! 每个 CPU 拥有独立自旋锁保护的空闲链表。分配与释放只访问本地链表，
//! 本地为空时从其他 CPU 窃取一页。

mod conf;
mod error;
mod kalloc;
mod page;
mod region;
mod stat;

pub use conf::{Conf, Config, Spread, default};
pub use error::{Error, Result};
pub use kalloc::Kalloc;
pub use page::Page;
pub use region::Region;
pub use stat::Stat;

/// Page size 4KB / 页大小
pub const PAGE_SIZE: usize = 4096;

/// Fill byte of freed pages, catches dangling references
/// 已释放页的填充字节，用于发现悬垂引用
pub const FREE_JUNK: u8 = 1;

/// Fill byte of freshly allocated pages, catches use of uninitialised memory
/// 新分配页的填充字节，用于发现未初始化使用
pub const ALLOC_JUNK: u8 = 5;
