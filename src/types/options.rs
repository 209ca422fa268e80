//! Generation options shared by every provider.

use std::any::Any;
use std::fmt;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Vendor-agnostic generation knobs.
///
/// Every field is optional; `None` means "not specified" and is distinct from
/// an explicit zero (a temperature of `0.0` is sent as-is).
///
/// ```
/// use llmux::types::{GenerationOptions, ResponseFormat};
///
/// let options = GenerationOptions::builder()
///     .temperature(0.0)
///     .max_tokens(256)
///     .response_format(ResponseFormat::JsonObject)
///     .build();
/// assert_eq!(options.temperature, Some(0.0));
/// assert_eq!(options.top_p, None);
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f64>,
    /// Nucleus-sampling threshold.
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub response_format: Option<ResponseFormat>,
    /// Tool definitions, passed to the vendor verbatim.
    pub tools: Option<Vec<serde_json::Value>>,
    /// Tool-choice strategy, passed to the vendor verbatim.
    pub tool_choice: Option<serde_json::Value>,
}

impl GenerationOptions {
    /// Whether structured JSON output was requested.
    pub fn wants_json(&self) -> bool {
        self.response_format == Some(ResponseFormat::JsonObject)
    }
}

/// Requested response format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text.
    None,
    JsonObject,
}

/// An options value accepted by [`crate::client::UnifiedClient::generate`].
///
/// Implemented by [`GenerationOptions`] and by each provider's extension type,
/// which embeds a copy of the common fields.
pub trait ProviderOptions: Any + Send + Sync + fmt::Debug {
    /// The vendor-agnostic fields.
    fn common(&self) -> &GenerationOptions;

    fn as_any(&self) -> &dyn Any;
}

impl ProviderOptions for GenerationOptions {
    fn common(&self) -> &GenerationOptions {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Implement [`ProviderOptions`] and `From<GenerationOptions>` for a vendor
/// extension struct with a `common: GenerationOptions` field.
#[allow(unused_macros)]
macro_rules! impl_provider_options {
    ($ty:ty) => {
        impl $crate::types::ProviderOptions for $ty {
            fn common(&self) -> &$crate::types::GenerationOptions {
                &self.common
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }

        impl From<$crate::types::GenerationOptions> for $ty {
            fn from(common: $crate::types::GenerationOptions) -> Self {
                Self {
                    common,
                    ..Default::default()
                }
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use impl_provider_options;
