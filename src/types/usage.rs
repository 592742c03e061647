//! Token usage tracking.

use serde::{Deserialize, Serialize};

/// Token usage accumulated over one or more model calls.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Usage {
    /// Number of model calls folded into this value.
    #[serde(default)]
    pub requests: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl Usage {
    /// Merge another usage into this one (accumulate).
    pub fn merge(&mut self, other: &Usage) {
        self.requests += other.requests;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        if let Some(v) = other.cached_input_tokens {
            *self.cached_input_tokens.get_or_insert(0) += v;
        }
        if let Some(v) = other.reasoning_tokens {
            *self.reasoning_tokens.get_or_insert(0) += v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_counts_and_optional_fields() {
        let mut total = Usage {
            requests: 1,
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
            ..Default::default()
        };
        total.merge(&Usage {
            requests: 1,
            input_tokens: 3,
            output_tokens: 2,
            total_tokens: 5,
            cached_input_tokens: Some(4),
            reasoning_tokens: None,
        });

        assert_eq!(total.requests, 2);
        assert_eq!(total.total_tokens, 20);
        assert_eq!(total.cached_input_tokens, Some(4));
        assert_eq!(total.reasoning_tokens, None);
    }
}
