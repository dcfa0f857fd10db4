#![cfg_attr(docsrs, feature(doc_cfg))]

//! # klock - Kernel lock primitives / 内核锁原语
//!
//! - [`cpu`]: processor identity bound per thread, push/pop off
//!   线程绑定的处理器标识，关闭/恢复调度
//! - [`SpinLock`]: short critical sections, rescheduling disabled
//!   短临界区，持锁期间关闭调度
//! - [`SleepLock`]: long critical sections, waiters sleep
//!   长临界区，等待者睡眠

pub mod cpu;
mod error;
mod sleep;
mod spin;

pub use error::{Error, Result};
pub use sleep::{SleepGuard, SleepLock};
pub use spin::{SpinGuard, SpinLock};
