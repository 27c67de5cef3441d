//! Credit pricing of rewrite requests and debit outcomes.

use serde::Serialize;

/// Words covered by a single credit.
pub const WORDS_PER_CREDIT: usize = 100;

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Credits charged for rewriting `text`: one per started hundred words,
/// never less than one.
pub fn credit_cost(text: &str) -> i64 {
    cost_for_words(word_count(text))
}

pub fn cost_for_words(words: usize) -> i64 {
    let credits = words.div_ceil(WORDS_PER_CREDIT).max(1);
    i64::try_from(credits).unwrap_or(i64::MAX)
}

/// Result of an atomic check-and-decrement against a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DebitOutcome {
    /// The balance covered the cost and was decremented.
    Debited { charged: i64, remaining: i64 },

    /// The balance was too small; nothing changed.
    Insufficient { required: i64, available: i64 },

    /// No entitlement row exists for the user.
    AccountNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_text_costs_one_credit() {
        assert_eq!(credit_cost(""), 1);
        assert_eq!(credit_cost("   \n\t"), 1);
    }

    #[test]
    fn hundred_words_cost_one_credit() {
        let text = vec!["word"; 100].join(" ");
        assert_eq!(credit_cost(&text), 1);
    }

    #[test]
    fn two_hundred_fifty_words_cost_three_credits() {
        let text = vec!["word"; 250].join(" ");
        assert_eq!(credit_cost(&text), 3);
    }

    #[test]
    fn counts_words_across_mixed_whitespace() {
        assert_eq!(word_count("one  two\nthree\tfour"), 4);
    }

    proptest! {
        #[test]
        fn cost_is_ceiling_of_hundreds(words in 0usize..100_000) {
            let cost = cost_for_words(words);
            prop_assert!(cost >= 1);
            prop_assert!((cost as usize) * WORDS_PER_CREDIT >= words);
            if words > WORDS_PER_CREDIT {
                prop_assert!(((cost - 1) as usize) * WORDS_PER_CREDIT < words);
            }
        }

        #[test]
        fn cost_is_monotonic(a in 0usize..50_000, b in 0usize..50_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(cost_for_words(lo) <= cost_for_words(hi));
        }
    }
}
