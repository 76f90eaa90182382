use std::ffi::CString;

use nix::unistd::execvp;

use super::error::ExecError;
use super::executor::Executor;
use super::process::{self, Spawned};
use super::Status;
use crate::shell::parser::ast::Command;
use crate::shell::signals::{self, InterruptGuard};

impl Executor {
    pub(super) fn execute_external(&mut self, command: &Command) -> Result<Status, ExecError> {
        match process::spawn()? {
            Spawned::Child => process::terminate(replace_image(command)),
            Spawned::Parent(pid) => {
                // 等待期间 Ctrl-C 只结束前台程序，guard 离开作用域时恢复
                let _interrupt = InterruptGuard::ignore()?;
                process::wait_for(pid)
            }
        }
    }
}

/// 在子进程里用外部程序替换当前映像，只有失败时才会返回。
fn replace_image(command: &Command) -> Result<Status, ExecError> {
    signals::reset_child_signals()?;

    let program = CString::new(command.program.as_str())
        .map_err(|_| ExecError::NulByte(command.program.clone()))?;
    let argv = command
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ExecError::NulByte(command.program.clone()))?;

    match execvp(&program, &argv) {
        Ok(never) => match never {},
        Err(source) => Err(ExecError::Exec {
            program: command.program.clone(),
            source,
        }),
    }
}
