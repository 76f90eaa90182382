use std::rc::Rc;

use log::debug;

use crate::shell::parser::ast::{Command, Node};

use super::builtin::Builtin;
use super::error::ExecError;
use super::process::{self, Spawned};
use super::scope::{FrameArena, ScopeArena, ScopeGuard};
use super::state::ProcessState;
use super::Status;

/// 命令树执行器。
///
/// 所有节点都从 [`Executor::execute`] 进入；需要隔离的节点在 fork 出的
/// 子进程里递归执行，父进程只拿到 pid 用来等待。
pub struct Executor {
    arena: Rc<dyn ScopeArena>,
    pub(super) state: ProcessState,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_arena(Rc::new(FrameArena::new()))
    }

    pub fn with_arena(arena: Rc<dyn ScopeArena>) -> Self {
        Self {
            arena,
            state: ProcessState::new(),
        }
    }

    /// 执行一个节点，返回前会等待它直接创建的所有子进程（detach 除外）。
    pub fn execute(&mut self, node: &Node) -> Result<Status, ExecError> {
        let arena = Rc::clone(&self.arena);
        let _scope = ScopeGuard::enter(arena.as_ref());

        debug!("执行 {} 节点, 深度 {}", node.variant(), arena.depth());
        match node {
            Node::Sequence { first, second } => self.execute_sequence(first, second),
            Node::Subshell(child) => self.execute_subshell(child),
            Node::Pipe(parts) => self.execute_pipe(parts),
            Node::Detach(child) => self.execute_detach(child),
            Node::Redirect(redirect) => self.execute_redirect(redirect),
            Node::Command(command) => self.execute_command(command),
        }
    }

    fn execute_sequence(&mut self, first: &Node, second: &Node) -> Result<Status, ExecError> {
        self.execute(first)?;
        self.execute(second)
    }

    fn execute_subshell(&mut self, child: &Node) -> Result<Status, ExecError> {
        match process::spawn()? {
            Spawned::Child => process::terminate(self.execute(child)),
            Spawned::Parent(pid) => process::wait_for(pid),
        }
    }

    fn execute_detach(&mut self, child: &Node) -> Result<Status, ExecError> {
        match process::spawn()? {
            Spawned::Child => {
                // 中间进程再 fork 一次就退出，工作进程交给 init 回收
                let result = match process::spawn() {
                    Ok(Spawned::Child) => process::terminate(self.execute(child)),
                    Ok(Spawned::Parent(pid)) => {
                        debug!("后台进程 {} 已脱离", pid);
                        Ok(0)
                    }
                    Err(e) => Err(e),
                };
                process::terminate(result)
            }
            Spawned::Parent(pid) => {
                process::wait_for(pid)?;
                Ok(0)
            }
        }
    }

    fn execute_command(&mut self, command: &Command) -> Result<Status, ExecError> {
        match Builtin::lookup(&command.program) {
            Some(builtin) => {
                debug!("执行内建命令: {:?}", command.argv);
                self.execute_builtin(builtin, command)
            }
            None => {
                debug!("执行外部命令: {:?}", command.argv);
                self.execute_external(command)
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
