use std::fs::{File, OpenOptions};
use std::os::fd::{OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::debug;

use super::error::ExecError;
use super::executor::Executor;
use super::process::{self, Spawned};
use super::Status;
use crate::shell::parser::ast::{Redirect, RedirectTarget};

const CREATE_MODE: u32 = 0o644;

/// 重定向目标解析后的描述符。
#[derive(Debug)]
pub enum Resolved {
    /// 新打开的文件，重定向完成后关闭
    Opened(OwnedFd),
    /// 已存在的描述符，原样使用
    Existing(RawFd),
}

impl Executor {
    pub(super) fn execute_redirect(&mut self, redirect: &Redirect) -> Result<Status, ExecError> {
        match process::spawn()? {
            Spawned::Child => {
                let result = apply(redirect.fd, &redirect.target)
                    .and_then(|()| self.execute(&redirect.child));
                process::terminate(result)
            }
            Spawned::Parent(pid) => process::wait_for(pid),
        }
    }
}

/// 在当前进程里把 `fd` 指向 `target`。只应在 fork 出的子进程里调用。
fn apply(fd: RawFd, target: &RedirectTarget) -> Result<(), ExecError> {
    debug!("重定向 {} ({:?}) {}", fd, target.mode(), target);
    match resolve(target)? {
        Resolved::Opened(file) => process::rebind(file, fd),
        Resolved::Existing(source) => process::duplicate(source, fd),
    }
}

/// 相对路径按解析时的工作目录计算。
pub fn resolve(target: &RedirectTarget) -> Result<Resolved, ExecError> {
    let opened = match target {
        RedirectTarget::Input(path) => open(path, OpenOptions::new().read(true)),
        RedirectTarget::Output(path) => open(
            path,
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(CREATE_MODE),
        ),
        RedirectTarget::Append(path) => open(
            path,
            OpenOptions::new()
                .append(true)
                .create(true)
                .mode(CREATE_MODE),
        ),
        RedirectTarget::Duplicate(source) => return Ok(Resolved::Existing(*source)),
    };
    opened.map(|file| Resolved::Opened(OwnedFd::from(file)))
}

fn open(path: &Path, options: &OpenOptions) -> Result<File, ExecError> {
    options.open(path).map_err(|source| ExecError::Open {
        path: path.to_path_buf(),
        source,
    })
}
