//! Character states and the sequences a matrix stores per taxon.
//!
//! A matrix does not care what a state *is*: DNA bases, morphological codes
//! and multi-character tokens all live side by side, so a sequence is an
//! ordered list of [`CharacterState`] values.

use std::fmt;
use std::ops::{Index, IndexMut};

pub const GAP_SYMBOL: char = '-';
pub const MISSING_SYMBOL: char = '?';

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CharacterState {
    Symbol(char),
    Code(i64),
    Token(String),
}

impl CharacterState {
    pub fn is_gap(&self) -> bool {
        matches!(self, CharacterState::Symbol(GAP_SYMBOL))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CharacterState::Symbol(MISSING_SYMBOL))
    }

    /// Gap or missing: the state carries no information for comparisons.
    pub fn is_undetermined(&self) -> bool {
        self.is_gap() || self.is_missing()
    }
}

impl fmt::Display for CharacterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterState::Symbol(c) => write!(f, "{c}"),
            CharacterState::Code(n) => write!(f, "{n}"),
            CharacterState::Token(s) => f.write_str(s),
        }
    }
}

impl From<char> for CharacterState {
    fn from(c: char) -> Self {
        CharacterState::Symbol(c)
    }
}

impl From<&str> for CharacterState {
    fn from(s: &str) -> Self {
        CharacterState::Token(s.to_owned())
    }
}

impl From<String> for CharacterState {
    fn from(s: String) -> Self {
        CharacterState::Token(s)
    }
}

impl From<&CharacterState> for CharacterState {
    fn from(state: &CharacterState) -> Self {
        state.clone()
    }
}

macro_rules! impl_code_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CharacterState {
                fn from(n: $t) -> Self {
                    CharacterState::Code(i64::from(n))
                }
            }
        )*
    };
}

impl_code_from!(i8, i16, i32, i64, u8, u16, u32);

/// Ordered character states for one taxon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CharacterSequence(Vec<CharacterState>);

impl CharacterSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CharacterState> {
        self.0.get(idx)
    }

    pub fn push(&mut self, state: impl Into<CharacterState>) {
        self.0.push(state.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CharacterState> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CharacterState> {
        self.0.iter_mut()
    }

    pub fn as_slice(&self) -> &[CharacterState] {
        &self.0
    }

    pub fn into_states(self) -> Vec<CharacterState> {
        self.0
    }

    /// True when every state is a single-character symbol, i.e. the sequence
    /// can be written as a plain string.
    pub fn is_symbolic(&self) -> bool {
        self.0.iter().all(|s| matches!(s, CharacterState::Symbol(_)))
    }
}

/// Symbol sequences print as a string (`ACGT`); anything else prints its
/// states separated by single spaces (`0 1 1 2`).
impl fmt::Display for CharacterSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.is_symbolic() { "" } else { " " };
        for (i, state) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{state}")?;
        }
        Ok(())
    }
}

impl Index<usize> for CharacterSequence {
    type Output = CharacterState;

    fn index(&self, idx: usize) -> &CharacterState {
        &self.0[idx]
    }
}

impl IndexMut<usize> for CharacterSequence {
    fn index_mut(&mut self, idx: usize) -> &mut CharacterState {
        &mut self.0[idx]
    }
}

impl<T: Into<CharacterState>> FromIterator<T> for CharacterSequence {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        CharacterSequence(iter.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CharacterState>> Extend<T> for CharacterSequence {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl From<&str> for CharacterSequence {
    fn from(s: &str) -> Self {
        s.chars().collect()
    }
}

impl From<String> for CharacterSequence {
    fn from(s: String) -> Self {
        s.chars().collect()
    }
}

impl<T: Into<CharacterState>> From<Vec<T>> for CharacterSequence {
    fn from(states: Vec<T>) -> Self {
        states.into_iter().collect()
    }
}

impl<T: Into<CharacterState>, const N: usize> From<[T; N]> for CharacterSequence {
    fn from(states: [T; N]) -> Self {
        states.into_iter().collect()
    }
}

impl<T: Into<CharacterState> + Clone> From<&[T]> for CharacterSequence {
    fn from(states: &[T]) -> Self {
        states.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a CharacterSequence {
    type Item = &'a CharacterState;
    type IntoIter = std::slice::Iter<'a, CharacterState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CharacterSequence {
    type Item = CharacterState;
    type IntoIter = std::vec::IntoIter<CharacterState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
