use log::{debug, error};
use std::env;
use std::error::Error;
use std::process;

use crate::shell::Shell;
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() {
    let config = Config::new();
    init_logger(&config);
    debug!("配置加载成功 {}", config.config_dir.display());

    let status = match run(&config) {
        Ok(status) => status,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}: {}", config.name, e);
            1
        }
    };
    process::exit(status);
}

fn run(config: &Config) -> Result<i32, Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut shell = Shell::new(config)?;

    match args.as_slice() {
        [] => shell.run(),
        [flag, line] if flag == "-c" => Ok(shell.run_line(line)),
        _ => Err(format!("用法: {} [-c COMMAND]", config.name).into()),
    }
}
