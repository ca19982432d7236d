//! Cache-busting token sources.

use std::cell::Cell;

use rand::distributions::{Distribution, Uniform};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 11;

/// Produces a fresh value for the cache-busting query parameter.
pub trait TokenSource {
    fn next_token(&self) -> String;
}

/// Random lowercase base-36 tokens shaped like the fractional digits of
/// `Math.random().toString(36)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomToken;

impl TokenSource for RandomToken {
    fn next_token(&self) -> String {
        let digit = Uniform::from(0..DIGITS.len());
        digit
            .sample_iter(rand::thread_rng())
            .take(RANDOM_LEN)
            .map(|i| char::from(DIGITS[i]))
            .collect()
    }
}

/// Deterministic `prefix0`, `prefix1`, ... tokens.
#[derive(Debug)]
pub struct SequentialToken {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialToken {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(0),
        }
    }
}

impl TokenSource for SequentialToken {
    fn next_token(&self) -> String {
        let n = self.next.get();
        self.next.set(n + 1);
        format!("{}{}", self.prefix, n)
    }
}

impl<F: Fn() -> String> TokenSource for F {
    fn next_token(&self) -> String {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_base36() {
        let token = RandomToken.next_token();
        assert_eq!(token.len(), RANDOM_LEN);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn random_tokens_differ() {
        let tokens: std::collections::HashSet<_> =
            (0..16).map(|_| RandomToken.next_token()).collect();
        assert!(tokens.len() > 1);
    }

    #[test]
    fn sequential_tokens_count_up() {
        let tokens = SequentialToken::new("t");
        assert_eq!(tokens.next_token(), "t0");
        assert_eq!(tokens.next_token(), "t1");
    }

    #[test]
    fn closures_are_sources() {
        let source = || "fixed".to_string();
        assert_eq!(source.next_token(), "fixed");
    }
}
