use std::env;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::ExecError;

/// 进程级状态：当前工作目录与环境变量表。
///
/// 两者都属于整个进程，fork 时被子进程按值复制。只有内建命令拿得到
/// `&mut ProcessState`，所以修改只发生在解释器自身的进程里；子 shell
/// 中的修改在它退出后对父进程不可见。
#[derive(Debug, Default)]
pub struct ProcessState {
    _private: (),
}

impl ProcessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn home(&self) -> Option<PathBuf> {
        env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }

    /// 切换目录，成功后同步 `OLDPWD` 与 `PWD`。
    pub fn change_dir(&mut self, path: &Path) -> Result<(), ExecError> {
        let previous = env::current_dir().ok();
        env::set_current_dir(path).map_err(|source| ExecError::ChangeDir {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(previous) = previous {
            env::set_var("OLDPWD", previous);
        }
        if let Ok(current) = env::current_dir() {
            debug!("工作目录切换到 {}", current.display());
            env::set_var("PWD", current);
        }
        Ok(())
    }

    pub fn set_var(&mut self, name: &str, value: &str) -> Result<(), ExecError> {
        validate_name("set", name)?;
        if value.contains('\0') {
            return Err(ExecError::NulByte("set".to_string()));
        }
        debug!("设置环境变量: {}={}", name, value);
        env::set_var(name, value);
        Ok(())
    }

    pub fn unset_var(&mut self, name: &str) -> Result<(), ExecError> {
        validate_name("unset", name)?;
        debug!("删除环境变量: {}", name);
        env::remove_var(name);
        Ok(())
    }
}

/// `env::set_var` 遇到空名、`=` 或 NUL 会 panic，提前拦下
fn validate_name(builtin: &'static str, name: &str) -> Result<(), ExecError> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(ExecError::InvalidName {
            builtin,
            name: name.to_string(),
        });
    }
    Ok(())
}
