//! Keyword values carried alongside image extensions.
//!
//! A [`Header`] is an ordered list of keyword cards, independent of any open
//! file. [`FitsWriter`](crate::FitsWriter) writes it after the structural
//! keywords cfitsio generates; [`FitsReader`](crate::FitsReader) fills one
//! from a list of typed keys.

use crate::{FitsError, FitsResult};

/// Value of a keyword card.
#[derive(Debug, Clone, PartialEq)]
pub enum FitsValue {
    String(String),
    Integer(i64),
    Float(f64),
}

impl FitsValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FitsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FitsValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FitsValue::Float(f) => Some(*f),
            FitsValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Type a keyword is read back as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    String,
    Integer,
    Float,
}

/// One keyword and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: FitsValue,
}

impl Card {
    pub fn new(keyword: &str, value: FitsValue) -> Self {
        Self {
            keyword: keyword.to_ascii_uppercase(),
            value,
        }
    }

    /// Keywords are at most 8 ASCII characters; floats must be finite.
    pub fn validate(&self) -> FitsResult<()> {
        if self.keyword.is_empty() || self.keyword.len() > 8 || !self.keyword.is_ascii() {
            return Err(FitsError::invalid(&self.keyword, "keywords are 1 to 8 ASCII characters"));
        }
        match &self.value {
            FitsValue::Float(f) if !f.is_finite() => {
                Err(FitsError::invalid(&self.keyword, "header floats must be finite"))
            }
            FitsValue::String(s) if !s.is_ascii() || s.len() > 68 => {
                Err(FitsError::invalid(&self.keyword, "strings are ASCII and fit in one card"))
            }
            _ => Ok(()),
        }
    }
}

/// Ordered collection of cards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Append a card, replacing an existing one with the same keyword.
    pub fn push(&mut self, card: Card) {
        match self.cards.iter_mut().find(|c| c.keyword == card.keyword) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
    }

    pub fn set(&mut self, key: &str, value: FitsValue) {
        self.push(Card::new(key, value));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set(key, FitsValue::String(value.to_string()));
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, FitsValue::Integer(value));
    }

    pub fn set_float(&mut self, key: &str, value: f64) {
        self.set(key, FitsValue::Float(value));
    }

    pub fn get(&self, key: &str) -> Option<&FitsValue> {
        self.cards
            .iter()
            .find(|c| c.keyword.eq_ignore_ascii_case(key))
            .map(|c| &c.value)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FitsValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FitsValue::as_i64)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FitsValue::as_f64)
    }

    /// Numeric value that must be present.
    pub fn require_float(&self, key: &str) -> FitsResult<f64> {
        match self.get(key) {
            Some(v) => v
                .as_f64()
                .ok_or_else(|| FitsError::invalid(key, "expected a number")),
            None => Err(FitsError::MissingKeyword(key.to_string())),
        }
    }
}
