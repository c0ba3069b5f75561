//! State conditions understood by the explicit-state backend.
//!
//! A small fragment of the constraint language over a single state `s`:
//!
//! ```text
//! s.light = Green              exact value set (`none` for empty)
//! s.queue = A->B + B->C
//! Red in s.light               membership
//! no s.queue / some s.queue    emptiness
//! (c1 or c2) and c3            connectives, also `||` and `&&`
//! ```
//!
//! Formulas on separate lines are conjoined.

use std::collections::BTreeMap;

use trellis_core::state::{EMPTY_RELATION, SET_DELIMITER};

use crate::error::SolverError;

const STATE_PREFIX: &str = "s.";

/// A parsed condition on one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Any(Vec<Condition>),
    All(Vec<Condition>),
    Equals { field: String, values: Vec<String> },
    Contains { field: String, value: String },
    Empty(String),
    NonEmpty(String),
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, SolverError> {
        let mut parser = Parser {
            tokens: tokenize(text),
            pos: 0,
        };
        parser.body()
    }

    /// Whether the condition holds in a state given as field -> values.
    pub fn holds(&self, state: &BTreeMap<String, Vec<String>>) -> bool {
        match self {
            Condition::Any(parts) => parts.iter().any(|c| c.holds(state)),
            Condition::All(parts) => parts.iter().all(|c| c.holds(state)),
            Condition::Equals { field, values } => state.get(field).is_some_and(|actual| {
                let mut actual = actual.clone();
                actual.sort();
                actual.dedup();
                actual == *values
            }),
            Condition::Contains { field, value } => {
                state.get(field).is_some_and(|v| v.contains(value))
            }
            Condition::Empty(field) => state.get(field).is_some_and(Vec::is_empty),
            Condition::NonEmpty(field) => state.get(field).is_some_and(|v| !v.is_empty()),
        }
    }

    /// Every field the condition mentions.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Any(parts) | Condition::All(parts) => {
                for part in parts {
                    part.collect_fields(out);
                }
            }
            Condition::Equals { field, .. }
            | Condition::Contains { field, .. }
            | Condition::Empty(field)
            | Condition::NonEmpty(field) => out.push(field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Equals,
    Plus,
    Newline,
    Word(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        let token = match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            '=' => Some(Token::Equals),
            '+' => Some(Token::Plus),
            '\n' => Some(Token::Newline),
            c if c.is_whitespace() => None,
            c => {
                word.push(c);
                continue;
            }
        };
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(&mut word)));
        }
        if let Some(token) = token {
            tokens.push(token);
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Word(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, options: &[&str]) -> bool {
        if self.peek_word().is_some_and(|w| options.iter().any(|o| *o == w)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn error(&self, what: &str) -> SolverError {
        match self.peek() {
            Some(token) => SolverError::Compile(format!("{what}, found {token:?}")),
            None => SolverError::Compile(format!("{what}, found end of input")),
        }
    }

    fn body(&mut self) -> Result<Condition, SolverError> {
        let mut parts = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }
            parts.push(self.disjunction()?);
            if self.peek().is_some_and(|t| *t != Token::Newline) {
                return Err(self.error("expected end of formula"));
            }
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::All(parts)
        })
    }

    fn disjunction(&mut self) -> Result<Condition, SolverError> {
        let mut parts = vec![self.conjunction()?];
        while self.eat_word(&["or", "||"]) {
            self.skip_newlines();
            parts.push(self.conjunction()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Any(parts)
        })
    }

    fn conjunction(&mut self) -> Result<Condition, SolverError> {
        let mut parts = vec![self.unary()?];
        while self.eat_word(&["and", "&&"]) {
            self.skip_newlines();
            parts.push(self.unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::All(parts)
        })
    }

    fn unary(&mut self) -> Result<Condition, SolverError> {
        if self.eat(&Token::Open) {
            self.skip_newlines();
            let inner = self.disjunction()?;
            self.skip_newlines();
            if !self.eat(&Token::Close) {
                return Err(self.error("expected `)`"));
            }
            return Ok(inner);
        }
        if self.eat_word(&["no"]) {
            return Ok(Condition::Empty(self.field()?));
        }
        if self.eat_word(&["some"]) {
            return Ok(Condition::NonEmpty(self.field()?));
        }

        let first = self
            .peek_word()
            .map(str::to_string)
            .ok_or_else(|| self.error("expected a formula"))?;
        self.pos += 1;
        if self.eat(&Token::Equals) {
            let field = field_name(&first)?;
            let values = self.values()?;
            return Ok(Condition::Equals { field, values });
        }
        if self.eat_word(&["in"]) {
            let field = self.field()?;
            return Ok(Condition::Contains {
                field,
                value: first,
            });
        }
        Err(self.error(&format!("expected `=` or `in` after {first}")))
    }

    fn field(&mut self) -> Result<String, SolverError> {
        let word = self
            .peek_word()
            .map(str::to_string)
            .ok_or_else(|| self.error("expected a field"))?;
        self.pos += 1;
        field_name(&word)
    }

    /// `v1 + v2 + ...`, sorted. `none` denotes the empty set.
    fn values(&mut self) -> Result<Vec<String>, SolverError> {
        let mut values = Vec::new();
        loop {
            let mut value = String::new();
            while let Some(word) = self.peek_word() {
                if matches!(word, "and" | "or" | "&&" | "||") {
                    break;
                }
                value.push_str(word);
                self.pos += 1;
            }
            if value.is_empty() {
                return Err(self.error("expected a value"));
            }
            if !value.split(SET_DELIMITER).all(|c| c == EMPTY_RELATION) {
                values.push(value);
            }
            if !self.eat(&Token::Plus) {
                break;
            }
        }
        values.sort();
        values.dedup();
        Ok(values)
    }
}

fn field_name(word: &str) -> Result<String, SolverError> {
    word.strip_prefix(STATE_PREFIX)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SolverError::Compile(format!("expected s.<field>, found {word}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn equality_ignores_order() {
        let c = Condition::parse("s.light = Red + Green").unwrap();
        assert!(c.holds(&state(&[("light", &["Green", "Red"])])));
        assert!(!c.holds(&state(&[("light", &["Green"])])));
    }

    #[test]
    fn none_is_empty() {
        let c = Condition::parse("s.queue = none -> none").unwrap();
        assert_eq!(
            c,
            Condition::Equals {
                field: "queue".into(),
                values: vec![]
            }
        );
        assert!(c.holds(&state(&[("queue", &[])])));
    }

    #[test]
    fn binary_values_join_columns() {
        let c = Condition::parse("s.queue = A -> B").unwrap();
        assert!(c.holds(&state(&[("queue", &["A->B"])])));
    }

    #[test]
    fn connectives_and_parens() {
        let c = Condition::parse("(s.light = Red or s.light = Green) and some s.queue").unwrap();
        assert!(c.holds(&state(&[("light", &["Green"]), ("queue", &["A->B"])])));
        assert!(!c.holds(&state(&[("light", &["Green"]), ("queue", &[])])));
        assert!(!c.holds(&state(&[("light", &["Amber"]), ("queue", &["A->B"])])));
    }

    #[test]
    fn lines_are_conjoined() {
        let c = Condition::parse("\n\ts.light = Red\n\tno s.queue\n").unwrap();
        assert!(matches!(&c, Condition::All(parts) if parts.len() == 2));
        assert!(c.holds(&state(&[("light", &["Red"]), ("queue", &[])])));
    }

    #[test]
    fn disjunction_across_lines() {
        let c = Condition::parse("\t(s.light = Red) or\n\t(Green in s.light)\n").unwrap();
        assert!(matches!(c, Condition::Any(_)));
        assert!(c.holds(&state(&[("light", &["Green", "Amber"])])));
    }

    #[test]
    fn empty_body_always_holds() {
        let c = Condition::parse("\n").unwrap();
        assert!(c.holds(&BTreeMap::new()));
    }

    #[test]
    fn referenced_fields() {
        let c = Condition::parse("s.a = X and (no s.b or Y in s.c)").unwrap();
        assert_eq!(c.fields(), ["a", "b", "c"]);
    }

    #[test]
    fn rejects_malformed() {
        for text in ["s.light =", "light = Red", "s.light != Red", "(s.light = Red", "s.light"] {
            assert!(
                matches!(Condition::parse(text), Err(SolverError::Compile(_))),
                "{text}"
            );
        }
    }
}
