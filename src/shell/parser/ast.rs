use std::fmt;
use std::os::fd::RawFd;
use std::path::PathBuf;

/// 一行输入解析出来的命令树，执行期间只读。
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Sequence { first: Box<Node>, second: Box<Node> },
    Subshell(Box<Node>),
    Pipe(Vec<Node>),
    Detach(Box<Node>),
    Redirect(Redirect),
    Command(Command),
}

impl Node {
    pub fn sequence(first: Node, second: Node) -> Self {
        Node::Sequence {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn subshell(child: Node) -> Self {
        Node::Subshell(Box::new(child))
    }

    pub fn detach(child: Node) -> Self {
        Node::Detach(Box::new(child))
    }

    pub fn redirect(child: Node, fd: RawFd, target: RedirectTarget) -> Self {
        Node::Redirect(Redirect {
            child: Box::new(child),
            fd,
            target,
        })
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Node::Sequence { .. } => "sequence",
            Node::Subshell(_) => "subshell",
            Node::Pipe(_) => "pipe",
            Node::Detach(_) => "detach",
            Node::Redirect(_) => "redirect",
            Node::Command(_) => "command",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub argv: Vec<String>,
}

impl Command {
    /// `words[0]` 是程序名；没有任何单词时返回 `None`。
    pub fn from_words(words: Vec<String>) -> Option<Self> {
        let program = words.first()?.clone();
        Some(Self {
            program,
            argv: words,
        })
    }

    /// argv[1..]
    pub fn arguments(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub child: Box<Node>,
    pub fd: RawFd,
    pub target: RedirectTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Input,
    Output,
    Append,
    DuplicateFd,
}

/// 重定向目标。文件类模式带路径，复制模式带描述符编号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Input(PathBuf),
    Output(PathBuf),
    Append(PathBuf),
    Duplicate(RawFd),
}

impl RedirectTarget {
    pub fn mode(&self) -> RedirectMode {
        match self {
            RedirectTarget::Input(_) => RedirectMode::Input,
            RedirectTarget::Output(_) => RedirectMode::Output,
            RedirectTarget::Append(_) => RedirectMode::Append,
            RedirectTarget::Duplicate(_) => RedirectMode::DuplicateFd,
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Input(path) => write!(f, "< {}", path.display()),
            RedirectTarget::Output(path) => write!(f, "> {}", path.display()),
            RedirectTarget::Append(path) => write!(f, ">> {}", path.display()),
            RedirectTarget::Duplicate(fd) => write!(f, ">&{}", fd),
        }
    }
}
