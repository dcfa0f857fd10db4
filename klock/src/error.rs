use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("locked / 已锁定")]
  Locked,
}

pub type Result<T> = std::result::Result<T, Error>;
