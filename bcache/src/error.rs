//! 错误定义 Error definitions

use thiserror::Error;

/// 结果类型 Result type
pub type Result<T> = std::result::Result<T, Error>;

/// 错误类型 Error type
#[derive(Error, Debug)]
pub enum Error {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// Every slot of the bucket is referenced / 桶内所有槽都被引用
  #[error("no free buffer in bucket {0}")]
  NoBuf(usize),
}
