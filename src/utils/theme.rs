use colored::Colorize;
use std::collections::HashMap;

type Style = Box<dyn Fn(String) -> String>;

pub struct Theme {
    messages: HashMap<&'static str, &'static str>,
    pub prompt_style: Style,
    pub success_style: Style,
    pub warning_style: Style,
    pub error_style: Style,
}

impl Theme {
    pub fn load_theme(theme_name: &str) -> Self {
        match theme_name {
            "dark" => Theme {
                messages: Self::messages(),
                prompt_style: Box::new(|s| s.bright_purple().to_string()),
                success_style: Box::new(|s| s.magenta().to_string()),
                warning_style: Box::new(|s| s.blue().to_string()),
                error_style: Box::new(|s| s.red().to_string()),
            },
            "plain" => Theme {
                messages: Self::messages(),
                prompt_style: Box::new(|s| s),
                success_style: Box::new(|s| s),
                warning_style: Box::new(|s| s),
                error_style: Box::new(|s| s),
            },
            _ => Theme {
                messages: Self::messages(),
                prompt_style: Box::new(|s| s.bright_cyan().to_string()),
                success_style: Box::new(|s| s.bright_green().to_string()),
                warning_style: Box::new(|s| s.yellow().to_string()),
                error_style: Box::new(|s| s.bright_red().to_string()),
            },
        }
    }

    fn messages() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("prompt", "arbor> "),
            ("welcome", "欢迎使用 Arbor Shell"),
            ("help", "输入 exit 退出，Ctrl-D 结束会话"),
            ("exit", "再见"),
            ("eof_signal", "收到 EOF，退出会话"),
            ("interrupt_signal", "已中断，按 Ctrl-D 或输入 exit 退出"),
            ("error", "错误"),
            ("error_symbol", "✗"),
        ])
    }

    pub fn get_message(&self, key: &str) -> String {
        self.messages.get(key).copied().unwrap_or(key).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_leaves_text_untouched() {
        let theme = Theme::load_theme("plain");
        assert_eq!((theme.prompt_style)(theme.get_message("prompt")), "arbor> ");
    }

    #[test]
    fn unknown_message_key_echoes_key() {
        assert_eq!(
            Theme::load_theme("default").get_message("missing"),
            "missing"
        );
    }
}
