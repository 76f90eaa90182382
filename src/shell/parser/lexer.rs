use std::iter::Peekable;
use std::os::fd::RawFd;
use std::str::Chars;

use super::parser::ParseError;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Word(String),
    Pipe,
    Redirect(Option<RawFd>, RedirectOp),
    Background,
    Semi,
    LParen,
    RParen,
    EOF,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RedirectOp {
    Input,     // <
    Output,    // >
    Append,    // >>
    DupInput,  // <&
    DupOutput, // >&
}

impl RedirectOp {
    pub fn default_fd(self) -> RawFd {
        match self {
            RedirectOp::Input | RedirectOp::DupInput => 0,
            RedirectOp::Output | RedirectOp::Append | RedirectOp::DupOutput => 1,
        }
    }
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let token = match self.peek_char() {
            None => Token::EOF,
            Some(c) => match c {
                '|' => {
                    self.read_char();
                    Token::Pipe
                }
                ';' => {
                    self.read_char();
                    Token::Semi
                }
                '&' => {
                    self.read_char();
                    Token::Background
                }
                '(' => {
                    self.read_char();
                    Token::LParen
                }
                ')' => {
                    self.read_char();
                    Token::RParen
                }
                '<' | '>' => self.read_redirect(None),
                _ => return self.read_word(),
            },
        };
        Ok(token)
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.read_char();
        }
    }

    fn read_redirect(&mut self, fd: Option<RawFd>) -> Token {
        let op = match self.read_char() {
            Some('<') => {
                if self.peek_char() == Some('&') {
                    self.read_char();
                    RedirectOp::DupInput
                } else {
                    RedirectOp::Input
                }
            }
            _ => match self.peek_char() {
                Some('>') => {
                    self.read_char();
                    RedirectOp::Append
                }
                Some('&') => {
                    self.read_char();
                    RedirectOp::DupOutput
                }
                _ => RedirectOp::Output,
            },
        };
        Token::Redirect(fd, op)
    }

    fn read_word(&mut self) -> Result<Token, ParseError> {
        let mut word = String::new();
        let mut quoted = false;

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || ";<>|&()".contains(c) {
                break;
            }
            if c == '"' || c == '\'' {
                quoted = true;
                self.read_quoted(&mut word)?;
                continue;
            }
            word.push(self.read_char().unwrap_or_default());
        }

        // `2>file` 中紧贴重定向符号的纯数字是描述符编号
        if !quoted && !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
            if let Some('<' | '>') = self.peek_char() {
                if let Ok(fd) = word.parse::<RawFd>() {
                    return Ok(self.read_redirect(Some(fd)));
                }
            }
        }

        Ok(Token::Word(word))
    }

    /// 读到行尾仍未闭合的引号是语法错误。
    fn read_quoted(&mut self, word: &mut String) -> Result<(), ParseError> {
        let quote = self.read_char().unwrap_or_default();
        let mut escaped = false;

        while let Some(c) = self.read_char() {
            match (escaped, c) {
                (true, _) => {
                    word.push(c);
                    escaped = false;
                }
                (false, '\\') if quote == '"' => escaped = true,
                (false, c) if c == quote => return Ok(()),
                (false, c) => word.push(c),
            }
        }
        Err(ParseError::UnclosedQuote(quote))
    }
}
