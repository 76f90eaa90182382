use log::{debug, error, warn};
use std::error::Error;
use std::io::{IsTerminal, Write};

use crate::shell::executor::{report, ExecError, Executor, Status};
use crate::shell::parser;
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::shell::signals;
use crate::utils::config::Config;
use crate::utils::theme::Theme;

/// 语法错误对应的状态
const PARSE_ERROR_STATUS: Status = 2;

enum Flow {
    Continue,
    Exit(Status),
}

pub struct Shell<'a> {
    config: &'a Config,
    theme: Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
    interactive: bool,
    last_status: Status,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Result<Self, Box<dyn Error>> {
        // 空闲时的 Ctrl-C 不结束 shell
        signals::install_interrupt_handler()?;

        Ok(Self {
            config,
            theme: Theme::load_theme(&config.theme),
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(),
            interactive: std::io::stdin().is_terminal(),
            last_status: 0,
        })
    }

    /// 交互式会话，读到 EOF 时以最后一条命令的状态结束。
    pub fn run(&mut self) -> Result<Status, Box<dyn Error>> {
        debug!("初始化 {}...", self.config.name);
        self.readline.load_history();

        if self.interactive {
            println!(
                "{}",
                (self.theme.success_style)(self.theme.get_message("welcome"))
            );
            println!(
                "{}",
                (self.theme.warning_style)(self.theme.get_message("help"))
            );
        }
        debug!("{} 准备就绪...", self.config.name);

        let status = self.run_loop()?;
        self.readline.save_history();

        debug!("退出 {}, 状态 {}", self.config.name, status);
        Ok(status)
    }

    /// `-c` 模式：执行一行后返回它的状态。
    pub fn run_line(&mut self, line: &str) -> Status {
        match self.handle_input(line) {
            Flow::Continue => self.last_status,
            Flow::Exit(status) => status,
        }
    }

    fn run_loop(&mut self) -> Result<Status, Box<dyn Error>> {
        loop {
            std::io::stdout().flush()?;
            // 非交互输入（脚本、管道）不输出提示符
            let prompt = if self.interactive {
                (self.theme.prompt_style)(self.theme.get_message("prompt"))
            } else {
                String::new()
            };

            match self.readline.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(err) = self.readline.add_history(&line) {
                        warn!("无法记录历史: {}", err);
                    }
                    if let Flow::Exit(status) = self.handle_input(&line) {
                        if self.interactive {
                            println!(
                                "{}",
                                (self.theme.success_style)(self.theme.get_message("exit"))
                            );
                        }
                        return Ok(status);
                    }
                }
                Err(ReadlineError::Eof) => {
                    debug!("接收到 EOF，退出会话");
                    if self.interactive {
                        println!(
                            "\n{}",
                            (self.theme.warning_style)(self.theme.get_message("eof_signal"))
                        );
                    }
                    return Ok(self.last_status);
                }
                Err(ReadlineError::Interrupted) => {
                    warn!("接收到中断信号...");
                    println!(
                        "\n{}",
                        (self.theme.warning_style)(self.theme.get_message("interrupt_signal"))
                    );
                    self.last_status = 130;
                }
                Err(err) => {
                    error!("读取输入失败: {}", err);
                    eprintln!(
                        "{}: {}",
                        (self.theme.error_style)(self.theme.get_message("error")),
                        err
                    );
                    return Ok(1);
                }
            }
        }
    }

    fn handle_input(&mut self, line: &str) -> Flow {
        debug!("执行命令: {}", line);
        let node = match parser::parse(line) {
            Ok(Some(node)) => node,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                warn!("{}", e);
                eprintln!("{}: {}", self.config.name, e);
                self.last_status = PARSE_ERROR_STATUS;
                return Flow::Continue;
            }
        };

        match self.executor.execute(&node) {
            Ok(status) => {
                self.last_status = status;
                if status != 0 && self.interactive {
                    eprintln!(
                        "{} {}",
                        (self.theme.error_style)(self.theme.get_message("error_symbol")),
                        (self.theme.error_style)(status.to_string())
                    );
                }
                Flow::Continue
            }
            Err(ExecError::Exit(status)) => {
                debug!("exit 请求, 状态 {}", status);
                Flow::Exit(status)
            }
            Err(e) if e.is_fatal() => {
                report(&e);
                Flow::Exit(1)
            }
            Err(e) => {
                report(&e);
                self.last_status = e.status();
                Flow::Continue
            }
        }
    }
}
