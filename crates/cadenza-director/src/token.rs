//! Transition generations.
//!
//! Every BGM request mints a fresh [`TransitionToken`]. Minting invalidates
//! all earlier tokens, so any multi-tick task holding an old token sees it
//! as stale at its next step and stops touching shared state.

/// One generation of the transition counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionToken(u64);

impl TransitionToken {
    /// Raw generation value.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Monotonic token counter.
#[derive(Debug, Default)]
pub struct TokenSource {
    current: u64,
}

impl TokenSource {
    /// Create a source. No token is current until the first mint.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Mint a new token, invalidating every earlier one.
    pub fn mint(&mut self) -> TransitionToken {
        self.current += 1;
        TransitionToken(self.current)
    }

    /// Invalidate every token without handing out a new one.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    /// Whether `token` is the most recently minted one and not invalidated.
    #[must_use]
    pub const fn is_current(&self, token: TransitionToken) -> bool {
        token.0 == self.current
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_invalidates_previous() {
        let mut tokens = TokenSource::new();
        let first = tokens.mint();
        assert!(tokens.is_current(first));

        let second = tokens.mint();
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_invalidate() {
        let mut tokens = TokenSource::new();
        let token = tokens.mint();
        tokens.invalidate();
        assert!(!tokens.is_current(token));
        assert_eq!(tokens.generation(), 2);
    }
}
