use libc::c_int;
use log::debug;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::shell::executor::ExecError;

extern "C" fn on_interrupt(_: c_int) {
    // 重新安装自身，空闲时的 Ctrl-C 不会结束 shell
    let _ = unsafe { signal::signal(Signal::SIGINT, SigHandler::Handler(on_interrupt)) };
}

fn set_handler(signal: Signal, handler: SigHandler) -> Result<SigAction, ExecError> {
    let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
    // SAFETY: 处理函数只调用 async-signal-safe 的 sigaction
    unsafe { signal::sigaction(signal, &action) }.map_err(ExecError::Signal)
}

fn set_interrupt(handler: SigHandler) -> Result<SigAction, ExecError> {
    set_handler(Signal::SIGINT, handler)
}

/// 启动时安装 SIGINT 处理函数。
pub fn install_interrupt_handler() -> Result<(), ExecError> {
    set_interrupt(SigHandler::Handler(on_interrupt))?;
    debug!("SIGINT 处理函数已安装");
    Ok(())
}

/// 即将替换进程映像的子进程恢复默认处置，前台程序仍可被 Ctrl-C 结束。
pub fn reset_interrupt_default() -> Result<(), ExecError> {
    set_interrupt(SigHandler::SigDfl).map(|_| ())
}

/// Rust 运行时在 main 之前忽略了 SIGPIPE，被忽略的处置会跨过 exec 保留下来。
/// 管道上游在下游提前退出后必须被 SIGPIPE 结束，而不是收到 EPIPE 继续写。
pub fn reset_pipe_default() -> Result<(), ExecError> {
    set_handler(Signal::SIGPIPE, SigHandler::SigDfl).map(|_| ())
}

/// exec 之前调用：外部程序以默认的信号处置启动。
pub fn reset_child_signals() -> Result<(), ExecError> {
    reset_interrupt_default()?;
    reset_pipe_default()
}

/// 前台等待期间让 shell 忽略 SIGINT，离开作用域时恢复原来的处置。
pub struct InterruptGuard {
    previous: SigAction,
}

impl InterruptGuard {
    pub fn ignore() -> Result<Self, ExecError> {
        let previous = set_interrupt(SigHandler::SigIgn)?;
        Ok(Self { previous })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        // SAFETY: 恢复的是之前由 sigaction 返回的合法处置
        let _ = unsafe { signal::sigaction(Signal::SIGINT, &self.previous) };
    }
}
