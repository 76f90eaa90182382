use std::os::fd::RawFd;
use std::path::PathBuf;

use thiserror::Error;

use super::ast::{Command, Node, RedirectTarget};
use super::lexer::{Lexer, RedirectOp, Token};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("语法错误: 意外的符号 {0}")]
    UnexpectedToken(String),
    #[error("语法错误: 重定向后缺少文件名")]
    MissingTarget,
    #[error("语法错误: {0} 不是有效的文件描述符")]
    InvalidDescriptor(String),
    #[error("语法错误: 缺少右括号")]
    UnclosedParen,
    #[error("语法错误: 引号 {0} 未闭合")]
    UnclosedQuote(char),
    #[error("语法错误: 缺少命令")]
    EmptyCommand,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
        })
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    /// 解析整行输入。空行返回 `Ok(None)`。
    pub fn parse_line(&mut self) -> Result<Option<Node>, ParseError> {
        if self.current_token == Token::EOF {
            return Ok(None);
        }
        let node = self.parse_list()?;
        match &self.current_token {
            Token::EOF => Ok(Some(node)),
            Token::RParen => Err(ParseError::UnexpectedToken(")".to_string())),
            token => Err(ParseError::UnexpectedToken(describe(token))),
        }
    }

    // list := pipeline ((';' | '&') pipeline)* [';' | '&']
    fn parse_list(&mut self) -> Result<Node, ParseError> {
        let mut items: Vec<Node> = Vec::new();

        loop {
            let mut item = self.parse_pipeline()?;
            let more = match self.current_token {
                Token::Semi => true,
                Token::Background => {
                    item = Node::detach(item);
                    true
                }
                _ => false,
            };
            items.push(item);
            if !more {
                break;
            }
            self.next_token()?;
            if matches!(self.current_token, Token::EOF | Token::RParen) {
                break;
            }
        }

        // 右结合：a; b; c => Sequence(a, Sequence(b, c))
        let mut node = items.pop().ok_or(ParseError::EmptyCommand)?;
        while let Some(previous) = items.pop() {
            node = Node::sequence(previous, node);
        }
        Ok(node)
    }

    fn parse_pipeline(&mut self) -> Result<Node, ParseError> {
        let mut parts = vec![self.parse_redirected()?];
        while self.current_token == Token::Pipe {
            self.next_token()?;
            parts.push(self.parse_redirected()?);
        }

        Ok(if parts.len() == 1 {
            parts.pop().ok_or(ParseError::EmptyCommand)?
        } else {
            Node::Pipe(parts)
        })
    }

    fn parse_redirected(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        let mut redirections = Vec::new();

        while let Token::Redirect(fd, op) = self.current_token.clone() {
            redirections.push(self.parse_redirection(fd, op)?);
        }

        // 先写的重定向在最外层，这样执行顺序与书写顺序一致
        while let Some((fd, target)) = redirections.pop() {
            node = Node::redirect(node, fd, target);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        match &self.current_token {
            Token::LParen => {
                self.next_token()?;
                if self.current_token == Token::RParen {
                    return Err(ParseError::EmptyCommand);
                }
                let inner = self.parse_list()?;
                if self.current_token != Token::RParen {
                    return Err(ParseError::UnclosedParen);
                }
                self.next_token()?;
                Ok(Node::subshell(inner))
            }
            Token::Word(_) => self.parse_simple_command(),
            Token::EOF => Err(ParseError::EmptyCommand),
            token => Err(ParseError::UnexpectedToken(describe(token))),
        }
    }

    fn parse_simple_command(&mut self) -> Result<Node, ParseError> {
        let mut words = Vec::new();
        while let Token::Word(word) = &self.current_token {
            words.push(word.clone());
            self.next_token()?;
        }
        Command::from_words(words)
            .map(Node::Command)
            .ok_or(ParseError::EmptyCommand)
    }

    fn parse_redirection(
        &mut self,
        fd: Option<RawFd>,
        op: RedirectOp,
    ) -> Result<(RawFd, RedirectTarget), ParseError> {
        self.next_token()?; // 跳过重定向操作符

        let word = match &self.current_token {
            Token::Word(word) => word.clone(),
            _ => return Err(ParseError::MissingTarget),
        };
        self.next_token()?;

        let target = match op {
            RedirectOp::Input => RedirectTarget::Input(PathBuf::from(word)),
            RedirectOp::Output => RedirectTarget::Output(PathBuf::from(word)),
            RedirectOp::Append => RedirectTarget::Append(PathBuf::from(word)),
            RedirectOp::DupInput | RedirectOp::DupOutput => {
                let source = word
                    .parse::<RawFd>()
                    .map_err(|_| ParseError::InvalidDescriptor(word.clone()))?;
                RedirectTarget::Duplicate(source)
            }
        };
        Ok((fd.unwrap_or_else(|| op.default_fd()), target))
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(word) => word.clone(),
        Token::Pipe => "|".to_string(),
        Token::Redirect(_, RedirectOp::Input) => "<".to_string(),
        Token::Redirect(_, RedirectOp::Output) => ">".to_string(),
        Token::Redirect(_, RedirectOp::Append) => ">>".to_string(),
        Token::Redirect(_, RedirectOp::DupInput) => "<&".to_string(),
        Token::Redirect(_, RedirectOp::DupOutput) => ">&".to_string(),
        Token::Background => "&".to_string(),
        Token::Semi => ";".to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::EOF => "EOF".to_string(),
    }
}

/// 解析一行输入，空行返回 `Ok(None)`。
pub fn parse(line: &str) -> Result<Option<Node>, ParseError> {
    Parser::new(line)?.parse_line()
}
