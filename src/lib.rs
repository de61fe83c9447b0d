mod error;
pub use error::Error;

mod part;
pub use part::{Part, DEFAULT_FILE_CONTENT_TYPE};

pub mod parser;

mod header_map;
pub use header_map::HeaderMap;

pub mod extract;
pub use extract::ExtractedFields;

pub mod encoder;
pub use encoder::{Attachment, OutboundPayload};

pub mod config;
pub use config::RelayConfig;

pub mod inbound;
pub mod relay;
pub use relay::{Relay, RelayOutcome};

pub mod service;
pub mod server;
pub use server::RelayServer;

pub mod telegram;
pub use telegram::{MessagingApi, TelegramClient};

/// Splits a complete multipart body received with the given Content-Type
/// value into its parts.
pub fn decode_with_content_type(
    content_type: &str,
    body: &bytes::Bytes,
) -> Result<Vec<Part>, Error> {
    let boundary = parser::boundary_from_content_type(content_type)?;
    parser::decode(body, &boundary)
}
