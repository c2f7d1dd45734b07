use serde::{Deserialize, Serialize};

/// Result of a single compression call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CompressedPrompt {
    pub compressed: String,
    pub original_tokens: u32,
    pub compressed_tokens: u32,
    /// `compressed_tokens / original_tokens`, or 1.0 when nothing was counted.
    pub ratio: f64,
    /// Percentage of tokens saved, within 0..=100.
    pub savings: f64,
}

impl CompressedPrompt {
    /// Builds a result whose ratio and savings derive from the token counts.
    pub fn from_counts(
        compressed: impl Into<String>,
        original_tokens: u32,
        compressed_tokens: u32,
    ) -> Self {
        let ratio = compression_ratio(original_tokens, compressed_tokens);
        Self {
            compressed: compressed.into(),
            original_tokens,
            compressed_tokens,
            ratio,
            savings: savings_percent(ratio),
        }
    }
}

pub fn compression_ratio(original_tokens: u32, compressed_tokens: u32) -> f64 {
    if original_tokens == 0 {
        return 1.0;
    }
    f64::from(compressed_tokens) / f64::from(original_tokens)
}

/// `(1 - ratio) * 100`, clamped to 0..=100 and rounded to two decimals.
pub fn savings_percent(ratio: f64) -> f64 {
    let raw = ((1.0 - ratio) * 100.0).clamp(0.0, 100.0);
    (raw * 100.0).round() / 100.0
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompressionOptions {
    /// Desired compressed/original ratio, 0.0 to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_context: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressive: Option<bool>,
}

impl CompressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_ratio(mut self, value: f64) -> Self {
        self.target_ratio = Some(value);
        self
    }

    pub fn preserve_context(mut self, value: bool) -> Self {
        self.preserve_context = Some(value);
        self
    }

    pub fn aggressive(mut self, value: bool) -> Self {
        self.aggressive = Some(value);
        self
    }
}
