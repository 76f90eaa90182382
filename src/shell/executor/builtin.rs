use std::path::Path;

use super::error::{report, ExecError};
use super::executor::Executor;
use super::state::ProcessState;
use super::Status;
use crate::shell::parser::ast::Command;

/// 不带参数的 `exit` 使用的退出状态。
pub const EXIT_SENTINEL: Status = 42;

/// 必须在解释器自身进程里执行的命令，它们的副作用要对后续命令可见。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd,
    Set,
    Unset,
}

impl Builtin {
    pub fn lookup(program: &str) -> Option<Self> {
        match program {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd),
            "set" => Some(Builtin::Set),
            "unset" => Some(Builtin::Unset),
            _ => None,
        }
    }
}

impl Executor {
    pub(super) fn execute_builtin(
        &mut self,
        builtin: Builtin,
        command: &Command,
    ) -> Result<Status, ExecError> {
        let args = command.arguments();
        let result = match builtin {
            Builtin::Exit => builtin_exit(args),
            Builtin::Cd => builtin_cd(&mut self.state, args),
            Builtin::Set => builtin_set(&mut self.state, args),
            Builtin::Unset => builtin_unset(&mut self.state, args),
        };

        match result {
            Ok(()) => Ok(0),
            Err(err @ ExecError::Exit(_)) => Err(err),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                report(&err);
                Ok(err.status())
            }
        }
    }
}

fn builtin_exit(args: &[String]) -> Result<(), ExecError> {
    Err(ExecError::Exit(parse_exit_code(args)?))
}

pub fn parse_exit_code(args: &[String]) -> Result<Status, ExecError> {
    match args.first() {
        None => Ok(EXIT_SENTINEL),
        Some(arg) => arg
            .trim()
            .parse::<Status>()
            .map_err(|_| ExecError::ExitArgument(arg.clone())),
    }
}

fn builtin_cd(state: &mut ProcessState, args: &[String]) -> Result<(), ExecError> {
    match args.first() {
        Some(path) => state.change_dir(Path::new(path)),
        // 找不到 HOME 时什么也不做
        None => match state.home() {
            Some(home) => state.change_dir(&home),
            None => Ok(()),
        },
    }
}

fn builtin_set(state: &mut ProcessState, args: &[String]) -> Result<(), ExecError> {
    let [assignment] = args else {
        return Err(ExecError::Usage {
            name: "set",
            usage: "set NAME=VALUE",
        });
    };
    let (name, value) = parse_assignment(assignment)?;
    state.set_var(name, value)
}

/// 按第一个 `=` 拆分，值可以为空，名字不行。
pub fn parse_assignment(arg: &str) -> Result<(&str, &str), ExecError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(ExecError::InvalidAssignment(arg.to_string())),
    }
}

fn builtin_unset(state: &mut ProcessState, args: &[String]) -> Result<(), ExecError> {
    if args.is_empty() {
        return Err(ExecError::Usage {
            name: "unset",
            usage: "unset NAME...",
        });
    }
    for name in args {
        state.unset_var(name)?;
    }
    Ok(())
}
