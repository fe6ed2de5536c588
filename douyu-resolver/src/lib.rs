// Douyu stream resolver
//
// Resolves Douyu live-room and on-demand video URLs into playable stream
// endpoints with quality labels. Media transport and playback are left to
// the caller.
//
// Architecture:
// - channel: URL parsing and channel id scraping
// - signer: request signatures from an external signing backend
// - client: HTTP access to the platform APIs
// - negotiator: per-quality stream assembly
// - resolver: the end-to-end pipeline

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod negotiator;
pub mod resolver;
pub mod signer;
pub mod types;
pub mod weight;

// Re-export common types for convenience
pub use client::DouyuClient;
pub use config::ResolverConfig;
pub use error::{ErrorKind, ResolveError, SignerFailure};
pub use resolver::DouyuResolver;
pub use signer::{NodeSigner, SignRequest, SignScope, Signer};
pub use types::{
    ChannelId, ChannelRef, Resolution, SignatureToken, StreamDescriptor, StreamTransport,
    Unavailable,
};
