use std::sync::OnceLock;

use hs_core::{ErrorDescriptor, SourceLocation, SourceSpan};
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number { value: f64, unit: Option<String> },
    Str(String),
    ClassRef(String),
    IdRef(String),
    Query(String),
    AttrRef(String),
    Possessive,
    Symbol(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
    /// Whitespace (or a comment) separates this token from the previous one.
    pub(crate) spaced: bool,
}

impl Token {
    pub(crate) fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub(crate) fn is_ident(&self, word: &str) -> bool {
        self.ident() == Some(word)
    }

    pub(crate) fn is_symbol(&self, symbol: &str) -> bool {
        matches!(&self.kind, TokenKind::Symbol(found) if *found == symbol)
    }

    pub(crate) fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn ends_value(&self) -> bool {
        match &self.kind {
            TokenKind::Symbol(symbol) => matches!(*symbol, ")" | "]" | "}"),
            TokenKind::Possessive => false,
            _ => true,
        }
    }
}

const SYMBOLS: [&str; 18] = [
    "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "(", ")", "[", "]", "{", "}", ",", ":", "<",
];

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)(ms|s)?").expect("number regex must compile")
    })
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

pub(crate) struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|(_, ch)| *ch)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.index)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = *self.chars.get(self.index)?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> ErrorDescriptor {
        let location = SourceLocation {
            line: self.line,
            column: self.column,
        };
        ErrorDescriptor::with_span(
            hs_core::ErrorKind::SyntaxError,
            "PARSE_TOKEN",
            message,
            SourceSpan {
                start: location.clone(),
                end: location,
            },
        )
    }

    fn previous_ends_value(&self, spaced: bool) -> bool {
        !spaced && self.tokens.last().is_some_and(Token::ends_value)
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, ErrorDescriptor> {
        let mut spaced = true;
        while let Some(ch) = self.peek_char(0) {
            if ch.is_whitespace() {
                self.bump();
                spaced = true;
                continue;
            }
            if ch == '-' && self.peek_char(1) == Some('-') {
                while let Some(next) = self.peek_char(0) {
                    if next == '\n' {
                        break;
                    }
                    self.bump();
                }
                spaced = true;
                continue;
            }

            let start = self.offset();
            let (line, column) = (self.line, self.column);
            let kind = self.read_token(ch, spaced)?;
            let end = self.offset();
            self.tokens.push(Token {
                kind,
                start,
                end,
                line,
                column,
                spaced,
            });
            spaced = false;
        }
        Ok(self.tokens)
    }

    fn read_token(&mut self, ch: char, spaced: bool) -> Result<TokenKind, ErrorDescriptor> {
        if ch.is_ascii_digit() || (ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.read_number();
        }
        if ch == '"' || (ch == '\'' && !self.is_possessive(spaced)) {
            return self.read_string(ch);
        }
        if ch == '\'' {
            self.bump();
            self.bump();
            return Ok(TokenKind::Possessive);
        }
        if ch == '.' && self.peek_char(1).is_some_and(is_name_char) {
            self.bump();
            if self.previous_ends_value(spaced) {
                return Ok(TokenKind::Symbol("."));
            }
            return Ok(TokenKind::ClassRef(self.read_while(is_name_char)));
        }
        if ch == '#' && self.peek_char(1).is_some_and(is_name_char) {
            self.bump();
            return Ok(TokenKind::IdRef(self.read_while(is_name_char)));
        }
        if ch == '@' && self.peek_char(1).is_some_and(is_name_char) {
            self.bump();
            return Ok(TokenKind::AttrRef(self.read_while(is_name_char)));
        }
        if ch == '<' && self.starts_query() {
            return self.read_query();
        }
        if is_ident_start(ch) {
            return Ok(TokenKind::Ident(self.read_identifier()));
        }
        for symbol in SYMBOLS {
            if self.source[self.offset()..].starts_with(symbol) {
                for _ in symbol.chars() {
                    self.bump();
                }
                return Ok(TokenKind::Symbol(symbol));
            }
        }
        if ch == '=' || ch == '>' {
            self.bump();
            return Ok(TokenKind::Symbol(if ch == '=' { "=" } else { ">" }));
        }
        if ch == '.' {
            self.bump();
            return Ok(TokenKind::Symbol("."));
        }
        Err(self.error(format!("Unexpected character '{}'.", ch)))
    }

    fn is_possessive(&self, spaced: bool) -> bool {
        !spaced
            && self.peek_char(1) == Some('s')
            && !self.peek_char(2).is_some_and(is_ident_char)
            && self.tokens.last().is_some_and(Token::ends_value)
    }

    fn starts_query(&self) -> bool {
        let Some(next) = self.peek_char(1) else {
            return false;
        };
        if !(next.is_ascii_alphabetic() || matches!(next, '.' | '#' | '[' | '*')) {
            return false;
        }
        let rest = &self.source[self.offset()..];
        match (rest.find("/>"), rest.find('\n')) {
            (Some(close), Some(newline)) => close < newline,
            (Some(_), None) => true,
            _ => false,
        }
    }

    fn read_query(&mut self) -> Result<TokenKind, ErrorDescriptor> {
        let start = self.offset();
        while !self.source[self.offset()..].starts_with("/>") {
            if self.bump().is_none() {
                return Err(self.error("Unterminated query literal."));
            }
        }
        self.bump();
        self.bump();
        Ok(TokenKind::Query(self.source[start..self.offset()].to_string()))
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek_char(0) {
            if !predicate(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    /// Identifiers may contain `-` or `:` when a letter follows, so `my-event` and
    /// `hyperscript:added` lex as single names.
    fn read_identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek_char(0) {
            let joins = matches!(ch, '-' | ':')
                && !out.is_empty()
                && self.peek_char(1).is_some_and(|next| next.is_alphabetic());
            if !(is_ident_char(ch) || joins) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    fn read_number(&mut self) -> Result<TokenKind, ErrorDescriptor> {
        let rest = &self.source[self.offset()..];
        let Some(captures) = number_regex().captures(rest) else {
            return Err(self.error("Malformed number."));
        };
        let digits = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut unit = captures.get(2).map(|m| m.as_str().to_string());
        let mut consumed = captures.get(0).map(|m| m.as_str().len()).unwrap_or_default();
        // `2seconds` style suffixes are not units, leave them to the identifier reader.
        if unit.is_some() && rest[consumed..].chars().next().is_some_and(is_ident_char) {
            consumed = digits.len();
            unit = None;
        }
        let value = digits
            .parse::<f64>()
            .map_err(|_| self.error(format!("Malformed number '{}'.", digits)))?;
        let count = rest[..consumed].chars().count();
        for _ in 0..count {
            self.bump();
        }
        Ok(TokenKind::Number { value, unit })
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, ErrorDescriptor> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string literal.")),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => return Err(self.error("Unterminated string literal.")),
                },
                Some(ch) if ch == quote => break,
                Some(ch) => out.push(ch),
            }
        }
        Ok(TokenKind::Str(out))
    }
}

#[cfg(test)]
mod lexer_tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("tokenize should pass")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn class_refs_and_property_dots_are_distinguished() {
        assert_eq!(
            kinds("add .active to me.parent"),
            vec![
                TokenKind::Ident("add".to_string()),
                TokenKind::ClassRef("active".to_string()),
                TokenKind::Ident("to".to_string()),
                TokenKind::Ident("me".to_string()),
                TokenKind::Symbol("."),
                TokenKind::Ident("parent".to_string()),
            ]
        );
    }

    #[test]
    fn durations_queries_and_possessives() {
        assert_eq!(
            kinds("wait 200ms then put <p.x/>'s length"),
            vec![
                TokenKind::Ident("wait".to_string()),
                TokenKind::Number {
                    value: 200.0,
                    unit: Some("ms".to_string())
                },
                TokenKind::Ident("then".to_string()),
                TokenKind::Ident("put".to_string()),
                TokenKind::Query("<p.x/>".to_string()),
                TokenKind::Possessive,
                TokenKind::Ident("length".to_string()),
            ]
        );
    }

    #[test]
    fn comparison_less_than_is_not_a_query() {
        assert_eq!(
            kinds("x < 3"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Symbol("<"),
                TokenKind::Number {
                    value: 3.0,
                    unit: None
                },
            ]
        );
    }

    #[test]
    fn comments_strings_and_dashed_names() {
        assert_eq!(
            kinds("send my-event -- trailing\n\"it's\""),
            vec![
                TokenKind::Ident("send".to_string()),
                TokenKind::Ident("my-event".to_string()),
                TokenKind::Str("it's".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let error = Lexer::new("log 'oops").tokenize().expect_err("should fail");
        assert_eq!(error.code, "PARSE_TOKEN");
        assert!(error.span.is_some());
    }
}
