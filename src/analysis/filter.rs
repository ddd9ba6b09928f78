//! Threshold predicates over derived rows.
//!
//! A small expression language, close to what one would type into a
//! dataframe query:
//!
//! ```text
//! acc_St.diff > 0 and -0.25 < entr_St.diff < 0.25
//! Corpus == "manchester" and (K >= 50 or not Method == "sum")
//! ```
//!
//! - Comparisons: `< <= > >= == !=`, chainable (`a < x < b`)
//! - Connectives: `and` / `&&` / `&`, `or` / `||` / `|`, `not` / `!`
//! - `and` binds tighter than `or`
//! - Numeric columns: metrics, baselines, diffs, `K`, `F`, `Time`, `X`, `Y`
//! - Categorical columns: any factor, compared with `==` / `!=` to a quoted string

use std::fmt;

use thiserror::Error;

use crate::types::{DerivedRow, Factor, NumericColumn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unterminated string starting at position {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{text}' at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("cannot order strings: '{column}' {op} ...")]
    StringOrdering { column: String, op: CmpOp },

    #[error("cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    fn compare_f64(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
        }
    }

    fn compare_str(self, a: &str, b: &str) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            // Rejected at parse time
            _ => false,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Cmp(op) => write!(f, "{}", op),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, FilterError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators first
        let two: String = chars[i..chars.len().min(i + 2)].iter().map(|&(_, c)| c).collect();
        let op2 = match two.as_str() {
            "<=" => Some(Token::Cmp(CmpOp::Le)),
            ">=" => Some(Token::Cmp(CmpOp::Ge)),
            "==" => Some(Token::Cmp(CmpOp::Eq)),
            "!=" => Some(Token::Cmp(CmpOp::Ne)),
            "&&" => Some(Token::And),
            "||" => Some(Token::Or),
            _ => None,
        };
        if let Some(token) = op2 {
            tokens.push((pos, token));
            i += 2;
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && peek(i + 1).is_some_and(|n| n.is_ascii_digit()))
            || ((c == '-' || c == '+')
                && peek(i + 1).is_some_and(|n| n.is_ascii_digit() || n == '.'));

        if starts_number {
            let start = i;
            i += 1;
            while let Some(n) = peek(i) {
                let prev = chars[i - 1].1;
                let exponent_sign = (n == '-' || n == '+') && (prev == 'e' || prev == 'E');
                if n.is_ascii_digit() || n == '.' || n == 'e' || n == 'E' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| FilterError::InvalidNumber { text: text.clone(), pos })?;
            tokens.push((pos, Token::Number(value)));
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while peek(i).is_some_and(is_ident_char) {
                i += 1;
            }
            let word: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            let token = match word.to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                _ => Token::Ident(word),
            };
            tokens.push((pos, token));
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && chars[end].1 != quote {
                end += 1;
            }
            if end >= chars.len() {
                return Err(FilterError::UnterminatedString { pos });
            }
            let text: String = chars[start..end].iter().map(|&(_, c)| c).collect();
            tokens.push((pos, Token::Str(text)));
            i = end + 1;
            continue;
        }

        let token = match c {
            '<' => Token::Cmp(CmpOp::Lt),
            '>' => Token::Cmp(CmpOp::Gt),
            '=' => Token::Cmp(CmpOp::Eq),
            '&' => Token::And,
            '|' => Token::Or,
            '!' => Token::Not,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => return Err(FilterError::UnexpectedChar { ch: c, pos }),
        };
        tokens.push((pos, token));
        i += 1;
    }

    Ok(tokens)
}

// ============================================================================
// Syntax tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Numeric(NumericColumn),
    /// Factor compared by level string
    Level(Factor),
    Number(f64),
    Str(String),
}

impl Operand {
    fn describe(&self) -> String {
        match self {
            Operand::Numeric(c) => c.name(),
            Operand::Level(f) => f.column().to_string(),
            Operand::Number(n) => n.to_string(),
            Operand::Str(s) => format!("\"{}\"", s),
        }
    }

    fn is_stringy(&self) -> bool {
        matches!(self, Operand::Level(_) | Operand::Str(_))
    }

    fn number(&self, row: &DerivedRow) -> Option<f64> {
        match self {
            Operand::Numeric(c) => row.value(*c),
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn text<'a>(&'a self, row: &'a DerivedRow) -> Option<&'a str> {
        match self {
            Operand::Level(f) => Some(row.level(*f)),
            Operand::Numeric(NumericColumn::Level(f)) => Some(row.level(*f)),
            Operand::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Compare { left: Operand, op: CmpOp, right: Operand },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

impl Node {
    fn eval(&self, row: &DerivedRow) -> bool {
        match self {
            Node::And(a, b) => a.eval(row) && b.eval(row),
            Node::Or(a, b) => a.eval(row) || b.eval(row),
            Node::Not(a) => !a.eval(row),
            Node::Compare { left, op, right } => {
                if left.is_stringy() || right.is_stringy() {
                    match (left.text(row), right.text(row)) {
                        (Some(a), Some(b)) => op.compare_str(a, b),
                        _ => false,
                    }
                } else {
                    match (left.number(row), right.number(row)) {
                        (Some(a), Some(b)) => op.compare_f64(a, b),
                        _ => false,
                    }
                }
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn unexpected(&self) -> FilterError {
        match self.tokens.get(self.pos) {
            Some((pos, token)) => FilterError::UnexpectedToken {
                found: token.to_string(),
                pos: *pos,
            },
            None => FilterError::UnexpectedEnd,
        }
    }

    fn parse_or(&mut self) -> Result<Node, FilterError> {
        let mut node = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            node = Node::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, FilterError> {
        let mut node = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            node = Node::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, FilterError> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((pos, token)) => Err(FilterError::UnexpectedToken {
                        found: token.to_string(),
                        pos,
                    }),
                    None => Err(FilterError::UnexpectedEnd),
                }
            }
            _ => self.parse_comparison(),
        }
    }

    /// `operand (op operand)+`, chains desugared into conjunctions.
    fn parse_comparison(&mut self) -> Result<Node, FilterError> {
        let mut left = self.parse_operand()?;
        let mut node: Option<Node> = None;

        while let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.parse_operand()?;
            check_operands(&left, op, &right)?;

            let cmp = Node::Compare {
                left,
                op,
                right: right.clone(),
            };
            node = Some(match node {
                Some(prev) => Node::And(Box::new(prev), Box::new(cmp)),
                None => cmp,
            });
            left = right;
        }

        node.ok_or_else(|| self.unexpected())
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterError> {
        let err = self.unexpected();
        match self.next() {
            Some((_, Token::Number(n))) => Ok(Operand::Number(n)),
            Some((_, Token::Str(s))) => Ok(Operand::Str(s)),
            Some((_, Token::Ident(name))) => resolve_column(&name),
            _ => Err(err),
        }
    }
}

fn resolve_column(name: &str) -> Result<Operand, FilterError> {
    if let Some(column) = NumericColumn::parse(name) {
        return Ok(Operand::Numeric(column));
    }
    if let Some(factor) = Factor::from_column(name) {
        return Ok(Operand::Level(factor));
    }
    Err(FilterError::UnknownColumn(name.to_string()))
}

/// Numbers and numeric columns that have no level string behind them.
fn is_plain_number(operand: &Operand) -> bool {
    match operand {
        Operand::Number(_) => true,
        Operand::Numeric(NumericColumn::Level(_)) => false,
        Operand::Numeric(_) => true,
        _ => false,
    }
}

fn check_operands(left: &Operand, op: CmpOp, right: &Operand) -> Result<(), FilterError> {
    if left.is_stringy() || right.is_stringy() {
        if !op.is_equality() {
            let column = if left.is_stringy() { left } else { right };
            return Err(FilterError::StringOrdering {
                column: column.describe(),
                op,
            });
        }
        // A string may be compared with a level-backed numeric column (K == "50")
        if is_plain_number(left) || is_plain_number(right) {
            return Err(FilterError::TypeMismatch {
                left: left.describe(),
                right: right.describe(),
            });
        }
    }
    Ok(())
}

/// A parsed row predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    root: Node,
}

impl Predicate {
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.unexpected());
        }
        Ok(Self {
            source: text.trim().to_string(),
            root,
        })
    }

    pub fn matches(&self, row: &DerivedRow) -> bool {
        self.root.eval(row)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Predicate {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::parse(s)
    }
}

/// Rows passing the predicate (all rows when there is none).
pub fn filter_rows<'a>(rows: &'a [DerivedRow], predicate: Option<&Predicate>) -> Vec<&'a DerivedRow> {
    rows.iter()
        .filter(|row| predicate.map_or(true, |p| p.matches(row)))
        .collect()
}

/// Per-row pass/fail, aligned with `rows`.
pub fn selection_mask(rows: &[DerivedRow], predicate: Option<&Predicate>) -> Vec<bool> {
    rows.iter()
        .map(|row| predicate.map_or(true, |p| p.matches(row)))
        .collect()
}
