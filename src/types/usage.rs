//! Token usage and normalized response types.

use serde::{Deserialize, Serialize};

/// Token usage for a generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from vendor-reported counts.
    ///
    /// A missing or zero total is derived as `prompt + completion`. Returns
    /// `None` when the vendor reported nothing at all.
    pub fn from_counts(prompt: u32, completion: u32, total: Option<u32>) -> Option<Self> {
        let total = match total {
            Some(total) if total > 0 => total,
            _ => prompt.saturating_add(completion),
        };
        if prompt == 0 && completion == 0 && total == 0 {
            return None;
        }
        Some(Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: total,
        })
    }
}

/// Vendor-agnostic result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    /// Every textual segment of the reply, concatenated in order.
    pub content: String,
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_derived_when_vendor_omits_it() {
        let usage = Usage::from_counts(12, 30, None).unwrap();
        assert_eq!(usage.total_tokens, 42);

        let usage = Usage::from_counts(12, 30, Some(0)).unwrap();
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn reported_total_is_kept() {
        let usage = Usage::from_counts(12, 30, Some(50)).unwrap();
        assert_eq!(usage.total_tokens, 50);
    }

    #[test]
    fn all_zero_usage_is_absent() {
        assert_eq!(Usage::from_counts(0, 0, None), None);
        assert_eq!(Usage::from_counts(0, 0, Some(0)), None);
    }
}
