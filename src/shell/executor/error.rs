use std::io;
use std::os::fd::RawFd;
use std::path::PathBuf;

use log::{error, warn};
use thiserror::Error;

use super::Status;

#[derive(Debug, Error)]
pub enum ExecError {
    /// 请求结束解释器（或当前子进程），不是真正的错误
    #[error("exit {0}")]
    Exit(Status),

    #[error("{name}: 用法: {usage}")]
    Usage {
        name: &'static str,
        usage: &'static str,
    },
    #[error("set: 无效的赋值 `{0}`，用法: set NAME=VALUE")]
    InvalidAssignment(String),
    #[error("{builtin}: `{name}` 不是有效的变量名")]
    InvalidName {
        builtin: &'static str,
        name: String,
    },
    #[error("cd: {}: {source}", path.display())]
    ChangeDir { path: PathBuf, source: io::Error },
    #[error("exit: {0}: 需要数字参数")]
    ExitArgument(String),
    #[error("{}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("无法将描述符 {from} 重定向到 {to}: {source}")]
    Rebind {
        from: RawFd,
        to: RawFd,
        source: nix::Error,
    },
    #[error("{program}: {source}")]
    Exec { program: String, source: nix::Error },
    #[error("{0}: 参数中包含 NUL 字节")]
    NulByte(String),

    #[error("fork 失败: {0}")]
    Fork(nix::Error),
    #[error("创建管道失败: {0}")]
    Pipe(nix::Error),
    #[error("等待子进程失败: {0}")]
    Wait(nix::Error),
    #[error("设置信号处理失败: {0}")]
    Signal(nix::Error),

    #[error("内部错误: {0}")]
    Contract(String),
}

impl ExecError {
    /// 资源耗尽或内部约定被破坏，解释器无法继续。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecError::Fork(_)
                | ExecError::Pipe(_)
                | ExecError::Wait(_)
                | ExecError::Signal(_)
                | ExecError::Contract(_)
        )
    }

    /// 用户错误在当前进程中对应的退出状态。
    pub fn status(&self) -> Status {
        match self {
            ExecError::Exit(code) => *code,
            ExecError::ExitArgument(_) => 2,
            ExecError::Exec { source, .. } if *source == nix::errno::Errno::ENOENT => 127,
            ExecError::Exec { .. } => 126,
            _ => 1,
        }
    }
}

/// 把错误报告给用户并记录日志。
pub fn report(err: &ExecError) {
    if err.is_fatal() {
        error!("{}", err);
    } else {
        warn!("{}", err);
    }
    eprintln!("{}: {}", env!("CARGO_PKG_NAME"), err);
}
