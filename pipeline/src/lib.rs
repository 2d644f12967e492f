//! # Pipeline
//!
//! Command-line parser for the shell.
//!
//! ## Philosophy
//!
//! - **Best effort**: malformed input degrades, it never raises
//! - **Quotes are literal**: a quoted `|`, `>` or `sudo` is just text
//! - **Stages carry their metadata**: privilege and redirect travel with
//!   the stage they belong to
//!
//! ## Grammar
//!
//! ```text
//! line     := stage ('|' stage)* ['&']
//! stage    := ['sudo'] command arg* ['>' target]
//! ```
//!
//! Tokens split on whitespace. Single quotes are fully literal. Outside
//! single quotes a backslash escapes the next character. Unquoted `|` and
//! `>` are operators even without surrounding spaces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Redirect of a stage's stdout to a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub target_path: String,
}

/// One command within a `|`-chained line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub command: String,
    pub args: Vec<String>,
    pub is_sudo: bool,
    pub redirect: Option<Redirect>,
    /// A `>` appeared with no target after it
    pub malformed_redirect: bool,
}

impl PipelineStage {
    /// Creates a plain stage
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            is_sudo: false,
            redirect: None,
            malformed_redirect: false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sudo && self.command != "sudo" {
            write!(f, "sudo ")?;
        }
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(redirect) = &self.redirect {
            write!(f, " > {}", redirect.target_path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// Quoted or escaped somewhere; never an operator
    literal: bool,
}

impl Token {
    fn is_operator(&self, op: &str) -> bool {
        !self.literal && self.text == op
    }
}

#[derive(Default)]
struct Lexer {
    segments: Vec<Vec<Token>>,
    current: String,
    literal: bool,
    in_token: bool,
}

impl Lexer {
    fn flush(&mut self) {
        if self.in_token {
            let token = Token {
                text: std::mem::take(&mut self.current),
                literal: self.literal,
            };
            self.segment().push(token);
        }
        self.literal = false;
        self.in_token = false;
    }

    fn segment(&mut self) -> &mut Vec<Token> {
        if self.segments.is_empty() {
            self.segments.push(Vec::new());
        }
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    fn push_char(&mut self, c: char) {
        self.in_token = true;
        self.current.push(c);
    }

    fn push_escaped(&mut self, next: Option<char>) {
        self.in_token = true;
        self.literal = true;
        self.current.push(next.unwrap_or('\\'));
    }

    fn tokenize(mut self, input: &str) -> Vec<Vec<Token>> {
        let mut quote: Option<char> = None;
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            match (quote, c) {
                (Some('\''), '\'') => quote = None,
                (Some('\''), c) => self.push_char(c),
                (Some(_), '\\') => self.push_escaped(chars.next()),
                (Some(q), c) if c == q => quote = None,
                (Some(_), c) => self.push_char(c),
                (None, '\'' | '"') => {
                    quote = Some(c);
                    self.in_token = true;
                    self.literal = true;
                }
                (None, '\\') => self.push_escaped(chars.next()),
                (None, '|') => {
                    self.flush();
                    self.segment();
                    self.segments.push(Vec::new());
                }
                (None, '>') => {
                    self.flush();
                    self.segment().push(Token {
                        text: ">".to_string(),
                        literal: false,
                    });
                }
                (None, c) if c.is_whitespace() => self.flush(),
                (None, c) => self.push_char(c),
            }
        }

        // An unterminated quote keeps whatever it collected.
        self.flush();
        self.segments
    }
}

fn build_stage(tokens: Vec<Token>) -> Option<PipelineStage> {
    if tokens.is_empty() {
        return None;
    }

    let mut tokens = tokens.into_iter().peekable();
    let is_sudo = tokens.next_if(|t| t.is_operator("sudo")).is_some();

    let mut words = Vec::new();
    let mut redirect = None;
    let mut malformed_redirect = false;
    while let Some(token) = tokens.next() {
        if token.is_operator(">") {
            match tokens.next_if(|t| !t.is_operator(">")) {
                Some(target) => {
                    redirect = Some(Redirect {
                        target_path: target.text,
                    })
                }
                None => malformed_redirect = true,
            }
        } else {
            words.push(token.text);
        }
    }

    let mut words = words.into_iter();
    let command = match words.next() {
        Some(command) => command,
        None if is_sudo && redirect.is_none() && !malformed_redirect => "sudo".to_string(),
        None => String::new(),
    };

    Some(PipelineStage {
        command,
        args: words.collect(),
        is_sudo,
        redirect,
        malformed_redirect,
    })
}

/// Parses a command line into its stages, left to right.
///
/// Empty segments (`a || b`, a trailing `|`) are dropped.
pub fn parse(input: &str) -> Vec<PipelineStage> {
    Lexer::default()
        .tokenize(input)
        .into_iter()
        .filter_map(build_stage)
        .collect()
}

/// Strips one trailing unescaped `&`, reporting whether it was present
pub fn split_background(line: &str) -> (String, bool) {
    let trimmed = line.trim_end();
    if let Some(rest) = trimmed.strip_suffix('&') {
        let escaped = rest.ends_with('\\') && !rest.ends_with("\\\\");
        if !escaped {
            return (rest.trim_end().to_string(), true);
        }
    }
    (trimmed.to_string(), false)
}
