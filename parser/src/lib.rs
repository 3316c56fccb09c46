pub mod from_yaml;
pub mod lexer;

pub use from_yaml::FromYaml;

use std::collections::BTreeMap;
use std::fmt;

use lexer::{
    Lexer,
    tokens::{Loc, Token, TokenType},
};

#[derive(Debug)]
pub enum YamlError {
    Generic(String),
}

impl fmt::Display for YamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YamlError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for YamlError {}

pub type ParseResult<T> = Result<T, YamlError>;

fn err(msg: impl Into<String>, loc: Option<Loc>) -> YamlError {
    match loc {
        Some(loc) => YamlError::Generic(format!("{} (at {loc})", msg.into())),
        None => YamlError::Generic(msg.into()),
    }
}

/// A YAML-subset value tree: the lexer/parser pipeline's output, independent
/// of any target Rust type. `FromYaml` impls walk this tree.
#[derive(Debug, Clone)]
pub enum YamlValue {
    Map(BTreeMap<String, YamlValue>),
    List(Vec<YamlValue>),
    Scalar(String),
}

impl YamlValue {
    pub fn get(&self, key: &str) -> Option<&YamlValue> {
        match self {
            YamlValue::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            YamlValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Builds a `YamlValue` tree from a token stream, tracking indentation the
/// way the source's location blocks are nested.
pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer
            .tokenize()
            .map_err(|e| YamlError::Generic(format!("Lexing error: {e}")))?;
        Ok(Self { tokens, cursor: 0 })
    }

    fn peek_kind(&self) -> Option<&TokenType> {
        self.tokens.get(self.cursor).map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenType> {
        self.tokens.get(self.cursor + offset).map(|t| &t.kind)
    }

    fn peek_loc(&self) -> Option<Loc> {
        self.tokens.get(self.cursor).map(|t| t.loc)
    }

    fn consume(&mut self, expected: TokenType) -> ParseResult<()> {
        let loc = self.peek_loc();
        match self.tokens.get(self.cursor) {
            Some(t) if std::mem::discriminant(&t.kind) == std::mem::discriminant(&expected) => {
                self.cursor += 1;
                Ok(())
            }
            Some(t) => Err(err(format!("Expected {:?}, found {:?}", expected, t.kind), Some(t.loc))),
            None => Err(err(format!("Expected {:?}, found end of input", expected), loc)),
        }
    }

    fn skip_blank_newlines(&mut self) {
        while matches!(self.peek_kind(), Some(TokenType::Newline)) {
            self.cursor += 1;
        }
    }

    /// Parses the whole document and verifies nothing dangling is left over.
    pub fn parse(&mut self) -> ParseResult<YamlValue> {
        self.skip_blank_newlines();
        if self.peek_kind().is_none() {
            return Ok(YamlValue::Scalar(String::new()));
        }

        let value = self.parse_document_value()?;

        self.skip_blank_newlines();
        if let Some(tok) = self.tokens.get(self.cursor) {
            return Err(err(
                format!("Expected end of document, found {:?}", tok.kind),
                Some(tok.loc),
            ));
        }
        Ok(value)
    }

    fn parse_document_value(&mut self) -> ParseResult<YamlValue> {
        match self.peek_kind() {
            Some(TokenType::Indent(n)) => {
                let indent = *n;
                if matches!(self.peek_kind_at(1), Some(TokenType::Dash)) {
                    self.parse_block_list(indent)
                } else {
                    self.parse_block_map(indent)
                }
            }
            _ => self.parse_scalar_token(),
        }
    }

    fn parse_scalar_token(&mut self) -> ParseResult<YamlValue> {
        let loc = self.peek_loc();
        match self.tokens.get(self.cursor).map(|t| t.kind.clone()) {
            Some(TokenType::Text(s)) | Some(TokenType::StringLit(s)) => {
                self.cursor += 1;
                Ok(YamlValue::Scalar(s))
            }
            Some(TokenType::Number(n)) => {
                self.cursor += 1;
                Ok(YamlValue::Scalar(n.to_string()))
            }
            Some(other) => Err(err(format!("Expected a value, found {:?}", other), loc)),
            None => Ok(YamlValue::Scalar(String::new())),
        }
    }

    /// Parses an (already peeked, not yet consumed) block map whose keys sit at `indent`.
    fn parse_block_map(&mut self, indent: usize) -> ParseResult<YamlValue> {
        let mut map = BTreeMap::new();
        loop {
            self.skip_blank_newlines();
            match self.peek_kind() {
                Some(TokenType::Indent(n)) if *n == indent => {
                    self.cursor += 1;
                }
                _ => break,
            }

            let (key, _) = self.expect_key()?;
            self.consume(TokenType::Colon)?;
            let value = self.parse_value_after_colon(indent)?;

            if map.insert(key.clone(), value).is_some() {
                return Err(err(format!("Duplicate key '{}' in map", key), self.peek_loc()));
            }
        }
        Ok(YamlValue::Map(map))
    }

    fn expect_key(&mut self) -> ParseResult<(String, Loc)> {
        let loc = self.peek_loc();
        match self.tokens.get(self.cursor).map(|t| t.kind.clone()) {
            Some(TokenType::Text(s)) | Some(TokenType::StringLit(s)) => {
                self.cursor += 1;
                Ok((s, loc.unwrap()))
            }
            Some(other) => Err(err(format!("Expected a map key, found {:?}", other), loc)),
            None => Err(err("Expected a map key, found end of input", loc)),
        }
    }

    /// Parses whatever follows `key:` - an inline scalar/list, or (if the rest
    /// of the line is empty) a nested block on subsequent, deeper-indented lines.
    fn parse_value_after_colon(&mut self, key_indent: usize) -> ParseResult<YamlValue> {
        match self.peek_kind() {
            Some(TokenType::LBracket) => self.parse_inline_list(),
            Some(TokenType::Newline) | None => {
                self.skip_blank_newlines();
                match self.peek_kind() {
                    Some(TokenType::Indent(n)) if *n > key_indent => {
                        let nested = *n;
                        if matches!(self.peek_kind_at(1), Some(TokenType::Dash)) {
                            self.parse_block_list(nested)
                        } else {
                            self.parse_block_map(nested)
                        }
                    }
                    _ => Ok(YamlValue::Scalar(String::new())),
                }
            }
            _ => self.parse_scalar_token(),
        }
    }

    /// Parses an (already peeked, not yet consumed) block list whose `-` markers sit at `indent`.
    fn parse_block_list(&mut self, indent: usize) -> ParseResult<YamlValue> {
        let mut items = Vec::new();
        loop {
            self.skip_blank_newlines();
            match self.peek_kind() {
                Some(TokenType::Indent(n)) if *n == indent => {
                    self.cursor += 1;
                }
                _ => break,
            }
            if !matches!(self.peek_kind(), Some(TokenType::Dash)) {
                break;
            }
            self.cursor += 1;
            items.push(self.parse_dash_item(indent + 2)?);
        }
        Ok(YamlValue::List(items))
    }

    /// Parses the content right after a `-` marker: a scalar, an inline list,
    /// an inline map starting with `key: value` on the same line, or (if the
    /// rest of the line is empty) a nested block map.
    fn parse_dash_item(&mut self, item_indent: usize) -> ParseResult<YamlValue> {
        match self.peek_kind() {
            Some(TokenType::LBracket) => self.parse_inline_list(),
            Some(TokenType::Text(_)) | Some(TokenType::StringLit(_))
                if matches!(self.peek_kind_at(1), Some(TokenType::Colon)) =>
            {
                self.parse_inline_map_from_dash(item_indent)
            }
            Some(TokenType::Newline) | None => {
                self.skip_blank_newlines();
                match self.peek_kind() {
                    Some(TokenType::Indent(n)) if *n >= item_indent => {
                        let nested = *n;
                        self.parse_block_map(nested)
                    }
                    _ => Ok(YamlValue::Scalar(String::new())),
                }
            }
            _ => self.parse_scalar_token(),
        }
    }

    /// A map whose first `key: value` pair is already positioned right after a
    /// `-` marker (no leading `Indent` token for that first entry); subsequent
    /// entries are ordinary indented sibling lines at `item_indent`.
    fn parse_inline_map_from_dash(&mut self, item_indent: usize) -> ParseResult<YamlValue> {
        let mut map = BTreeMap::new();
        loop {
            let (key, _) = self.expect_key()?;
            self.consume(TokenType::Colon)?;
            let value = self.parse_value_after_colon(item_indent)?;
            if map.insert(key.clone(), value).is_some() {
                return Err(err(format!("Duplicate key '{}' in map", key), self.peek_loc()));
            }

            self.skip_blank_newlines();
            match self.peek_kind() {
                Some(TokenType::Indent(n)) if *n == item_indent => {
                    self.cursor += 1;
                }
                _ => break,
            }
        }
        Ok(YamlValue::Map(map))
    }

    fn parse_inline_list(&mut self) -> ParseResult<YamlValue> {
        self.consume(TokenType::LBracket)?;
        let mut items = Vec::new();

        loop {
            while matches!(self.peek_kind(), Some(TokenType::Newline) | Some(TokenType::Indent(_))) {
                self.cursor += 1;
            }
            if matches!(self.peek_kind(), Some(TokenType::RBracket)) {
                break;
            }
            items.push(self.parse_scalar_token()?);

            while matches!(self.peek_kind(), Some(TokenType::Newline) | Some(TokenType::Indent(_))) {
                self.cursor += 1;
            }
            if matches!(self.peek_kind(), Some(TokenType::Comma)) {
                self.cursor += 1;
            } else {
                break;
            }
        }

        self.consume(TokenType::RBracket)?;
        Ok(YamlValue::List(items))
    }
}
