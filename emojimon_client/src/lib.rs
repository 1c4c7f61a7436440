/**
 * Emojimon Client
 *
 * Optimistic command execution over a local mirror of the world tables,
 * plus the social layer used by the chat screen.
 */
pub mod authority;
pub mod chat_room;
pub mod client;
pub mod config;
pub mod devnet;
pub mod error;
pub mod social;
pub mod store;
pub mod system_calls;
pub mod tx_stream;

#[cfg(test)]
mod scenarios;

pub use authority::{SocialAuthority, Submission, TxOptions, WorldAuthority, WorldCall};
pub use client::{create_devnet_network, create_devnet_network_with_map, Network};
pub use config::ClientConfig;
pub use error::{ClientError, Precondition};
pub use system_calls::SystemCalls;
pub use tx_stream::{Receipt, TxStream};
