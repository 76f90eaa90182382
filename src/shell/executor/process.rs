use std::io::{self, Write};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::process;

use log::debug;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, ForkResult, Pid};

use super::error::{report, ExecError};
use super::Status;

pub enum Spawned {
    Child,
    Parent(Pid),
}

/// 复制当前进程。子进程继承环境变量、工作目录与描述符表的副本。
pub fn spawn() -> Result<Spawned, ExecError> {
    // 缓冲区里没写出去的内容会被复制两份
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    // SAFETY: 解释器是单线程的，子进程只会继续执行本进程的代码后退出或 exec
    match unsafe { fork() } {
        Ok(ForkResult::Child) => Ok(Spawned::Child),
        Ok(ForkResult::Parent { child }) => {
            debug!("创建子进程 {}", child);
            Ok(Spawned::Parent(child))
        }
        Err(e) => Err(ExecError::Fork(e)),
    }
}

/// 阻塞等待指定子进程结束。被信号杀死时返回 128 + 信号值。
pub fn wait_for(pid: Pid) -> Result<Status, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!("子进程 {} 退出, 状态 {}", pid, code);
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!("子进程 {} 被信号 {} 结束", pid, signal);
                return Ok(128 + signal as Status);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ExecError::Wait(e)),
        }
    }
}

/// 子进程的出口：把执行结果换成退出状态后结束进程，绝不返回调用方。
pub fn terminate(result: Result<Status, ExecError>) -> ! {
    let status = match result {
        Ok(status) => status,
        Err(ExecError::Exit(code)) => code,
        Err(err) => {
            report(&err);
            err.status()
        }
    };
    process::exit(status)
}

/// 把 `fd` 复制到 `slot` 上并关闭原描述符。
pub fn rebind(fd: OwnedFd, slot: RawFd) -> Result<(), ExecError> {
    let raw = fd.as_raw_fd();
    if raw == slot {
        // 已经就位，关闭它就等于关闭目标
        let _ = fd.into_raw_fd();
        return Ok(());
    }
    duplicate(raw, slot)
}

/// 让 `slot` 指向 `source` 已经打开的对象，不关闭 `source`。
pub fn duplicate(source: RawFd, slot: RawFd) -> Result<(), ExecError> {
    if source == slot {
        return Ok(());
    }
    dup2(source, slot).map_err(|e| ExecError::Rebind {
        from: source,
        to: slot,
        source: e,
    })?;
    Ok(())
}
