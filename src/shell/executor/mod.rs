mod builtin;
mod error;
mod executor;
mod external;
mod pipeline;
mod process;
mod redirect;
mod scope;
mod state;

/// 子进程退出状态；被信号结束时为 128 + 信号值。
pub type Status = i32;

pub use error::{report, ExecError};
pub use executor::Executor;
