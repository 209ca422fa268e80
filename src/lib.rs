//! llmux: one client, many LLM providers.
//!
//! A single execution core sends chat-completion requests to any supported
//! vendor. Each vendor is described by a stateless [`provider::ProviderAdapter`];
//! the [`client::UnifiedClient`] owns HTTP transport, retries with backoff,
//! cancellation and error classification.
//!
//! # Quick Start
//!
//! ```no_run
//! use llmux::prelude::*;
//!
//! # async fn example() -> llmux::error::Result<()> {
//! let client = UnifiedClient::from_env("openai")?;
//! let ctx = CallContext::with_timeout(std::time::Duration::from_secs(30));
//! let messages = [
//!     Message::system("You are terse."),
//!     Message::user("Name one prime number."),
//! ];
//! let reply = client.generate(&ctx, &messages, "gpt-4o-mini", &[]).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod types;
pub mod util;
