use hs_core::{ErrorDescriptor, ErrorKind, SourceLocation, SourceSpan};

use crate::lexer::{Token, TokenKind};

pub(crate) const COMMAND_WORDS: [&str; 24] = [
    "add", "remove", "toggle", "put", "set", "get", "log", "hide", "show", "wait", "send",
    "trigger", "increment", "decrement", "if", "repeat", "for", "tell", "call", "break",
    "continue", "return", "exit", "halt",
];

pub(crate) const FEATURE_WORDS: [&str; 3] = ["on", "def", "init"];

/// Words that end a command list.
pub(crate) const TERMINATOR_WORDS: [&str; 4] = ["then", "end", "else", "otherwise"];

/// Words that introduce a command clause and therefore never start an expression.
const CLAUSE_WORDS: [&str; 16] = [
    "to", "from", "into", "before", "after", "at", "in", "by", "on", "with", "or", "and", "times",
    "of", "as", "is",
];

pub(crate) struct Parser<'a> {
    pub(crate) source: &'a str,
    pub(crate) tokens: Vec<Token>,
    pub(crate) index: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            index: 0,
        }
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }

    pub(crate) fn check_ident(&self, word: &str) -> bool {
        self.peek().is_some_and(|token| token.is_ident(word))
    }

    pub(crate) fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|token| token.is_symbol(symbol))
    }

    pub(crate) fn accept_ident(&mut self, word: &str) -> bool {
        if self.check_ident(word) {
            self.index += 1;
            return true;
        }
        false
    }

    pub(crate) fn accept_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.index += 1;
            return true;
        }
        false
    }

    pub(crate) fn expect_ident(&mut self, word: &str) -> Result<(), ErrorDescriptor> {
        if self.accept_ident(word) {
            return Ok(());
        }
        Err(self.error_here(
            "PARSE_EXPECTED_KEYWORD",
            format!("Expected '{}' but found {}.", word, self.describe_current()),
        ))
    }

    pub(crate) fn expect_symbol(&mut self, symbol: &str) -> Result<(), ErrorDescriptor> {
        if self.accept_symbol(symbol) {
            return Ok(());
        }
        Err(self.error_here(
            "PARSE_EXPECTED_SYMBOL",
            format!("Expected '{}' but found {}.", symbol, self.describe_current()),
        ))
    }

    pub(crate) fn expect_name(&mut self, what: &str) -> Result<String, ErrorDescriptor> {
        match self.peek().and_then(Token::ident).map(str::to_string) {
            Some(name) => {
                self.index += 1;
                Ok(name)
            }
            None => Err(self.error_here(
                "PARSE_EXPECTED_NAME",
                format!("Expected {} but found {}.", what, self.describe_current()),
            )),
        }
    }

    /// Block `end` is optional right before another feature or the end of input.
    pub(crate) fn expect_block_end(&mut self) -> Result<(), ErrorDescriptor> {
        if self.accept_ident("end") {
            return Ok(());
        }
        if self.at_end() || self.at_feature_start() {
            return Ok(());
        }
        self.expect_ident("end")
    }

    pub(crate) fn at_feature_start(&self) -> bool {
        self.peek()
            .and_then(Token::ident)
            .is_some_and(|word| FEATURE_WORDS.contains(&word))
    }

    pub(crate) fn starts_expression(&self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        match &token.kind {
            TokenKind::Ident(word) => {
                !COMMAND_WORDS.contains(&word.as_str())
                    && !TERMINATOR_WORDS.contains(&word.as_str())
                    && !FEATURE_WORDS.contains(&word.as_str())
                    && !CLAUSE_WORDS.contains(&word.as_str())
            }
            TokenKind::Symbol(symbol) => matches!(*symbol, "(" | "[" | "{" | "-"),
            TokenKind::Possessive => false,
            _ => true,
        }
    }

    pub(crate) fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(token) => format!("'{}'", &self.source[token.start..token.end]),
        }
    }

    fn current_location(&self) -> SourceLocation {
        match self.peek().or_else(|| self.tokens.last()) {
            Some(token) => token.location(),
            None => SourceLocation { line: 1, column: 1 },
        }
    }

    pub(crate) fn error_here(&self, code: &str, message: impl Into<String>) -> ErrorDescriptor {
        let location = self.current_location();
        ErrorDescriptor::with_span(
            ErrorKind::SyntaxError,
            code,
            message,
            SourceSpan {
                start: location.clone(),
                end: location,
            },
        )
    }

    /// Span and raw source covering tokens `[start_index, self.index)`.
    pub(crate) fn slice_since(&self, start_index: usize) -> (String, SourceSpan) {
        let Some(first) = self.tokens.get(start_index) else {
            return (String::new(), SourceSpan::synthetic());
        };
        let last = self
            .tokens
            .get(self.index.saturating_sub(1))
            .filter(|_| self.index > start_index)
            .unwrap_or(first);
        let text = self.source[first.start..last.end].to_string();
        let end_column = last.column + self.source[last.start..last.end].chars().count();
        (
            text,
            SourceSpan {
                start: first.location(),
                end: SourceLocation {
                    line: last.line,
                    column: end_column,
                },
            },
        )
    }
}
