use std::mem;
use std::os::fd::OwnedFd;

use libc::{STDIN_FILENO, STDOUT_FILENO};
use log::debug;
use nix::unistd::{pipe, Pid};

use super::error::ExecError;
use super::executor::Executor;
use super::process::{self, Spawned};
use super::Status;
use crate::shell::parser::ast::Node;

/// 单向管道，两端都是 `OwnedFd`，drop 即关闭。
struct Channel {
    read: OwnedFd,
    write: OwnedFd,
}

fn open_channels(count: usize) -> Result<Vec<Channel>, ExecError> {
    (0..count)
        .map(|_| {
            pipe()
                .map(|(read, write)| Channel { read, write })
                .map_err(ExecError::Pipe)
        })
        .collect()
}

/// 第 `index` 个阶段只保留管道 `index - 1` 的读端和管道 `index` 的写端。
///
/// 其余描述符必须先全部关闭：只要还有一个写端开着，下游就永远读不到 EOF。
fn wire_stage(index: usize, channels: Vec<Channel>) -> Result<(), ExecError> {
    let mut input = None;
    let mut output = None;

    for (position, channel) in channels.into_iter().enumerate() {
        let Channel { read, write } = channel;
        if position + 1 == index {
            input = Some(read);
        } else if position == index {
            output = Some(write);
        }
        // 没被取走的端在这里 drop
    }

    if let Some(read) = input {
        process::rebind(read, STDIN_FILENO)?;
    }
    if let Some(write) = output {
        process::rebind(write, STDOUT_FILENO)?;
    }
    Ok(())
}

/// 等待每一个阶段，返回最后一个阶段的状态。
///
/// 某次等待出错时其余阶段照样回收，最后报告第一个错误。
fn reap_all<W>(children: Vec<Pid>, mut wait: W) -> Result<Status, ExecError>
where
    W: FnMut(Pid) -> Result<Status, ExecError>,
{
    let mut status = Ok(0);
    for pid in children {
        let result = wait(pid);
        if status.is_ok() {
            status = result;
        }
    }
    status
}

impl Executor {
    pub(super) fn execute_pipe(&mut self, parts: &[Node]) -> Result<Status, ExecError> {
        if parts.len() < 2 {
            return Err(ExecError::Contract(format!(
                "管道至少需要两个阶段, 实际为 {}",
                parts.len()
            )));
        }

        let mut channels = open_channels(parts.len() - 1)?;
        let mut children = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            match process::spawn() {
                Ok(Spawned::Child) => {
                    let result = wire_stage(index, mem::take(&mut channels))
                        .and_then(|()| self.execute(part));
                    process::terminate(result)
                }
                Ok(Spawned::Parent(pid)) => children.push(pid),
                Err(e) => {
                    // 已启动的阶段读到 EOF 后会结束，回收它们再报告
                    drop(channels);
                    for pid in children {
                        let _ = process::wait_for(pid);
                    }
                    return Err(e);
                }
            }
        }

        // 父进程不持有任何管道端
        drop(channels);
        debug!("管道已启动 {} 个阶段", children.len());

        reap_all(children, process::wait_for)
    }
}
