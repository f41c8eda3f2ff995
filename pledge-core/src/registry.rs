//! Token-keyed, insertion-ordered observer storage.

use crate::Token;
use core::mem;

/// Observers keyed by increasing tokens.
///
/// Entries are appended, so the vector stays sorted by token and lookups can
/// binary search while iteration follows registration order.
pub(crate) struct HandlerRegistry<H> {
    entries: Vec<(Token, H)>,
    next: u64,
}

impl<H> HandlerRegistry<H> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }

    pub(crate) fn insert(&mut self, handler: H) -> Token {
        let token = Token::new(self.next);
        self.next += 1;
        self.entries.push((token, handler));
        token
    }

    /// Remove the entry for `token`; stale tokens return `None`.
    pub(crate) fn remove(&mut self, token: Token) -> Option<H> {
        let index = self.position(token)?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn contains(&self, token: Token) -> bool {
        self.position(token).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Empty the registry. The token counter is kept so tokens are never reissued.
    pub(crate) fn take(&mut self) -> Vec<(Token, H)> {
        mem::take(&mut self.entries)
    }

    fn position(&self, token: Token) -> Option<usize> {
        self.entries
            .binary_search_by_key(&token, |(t, _)| *t)
            .ok()
    }
}

impl<H: Clone> HandlerRegistry<H> {
    pub(crate) fn snapshot(&self) -> Vec<(Token, H)> {
        self.entries.clone()
    }
}
