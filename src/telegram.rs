use std::future::Future;

use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};

use crate::{config::RelayConfig, encoder::OutboundPayload, Error};

pub const SEND_MESSAGE: &str = "sendMessage";
pub const SEND_PHOTO: &str = "sendPhoto";

/// The two calls made against the messaging API.
///
/// Implementations report any refusal by the API as `Error::Upstream`.
pub trait MessagingApi: Send + Sync {
    fn send_message(&self, chat_id: &str, text: &str)
        -> impl Future<Output = Result<(), Error>> + Send;

    /// Sends an already encoded multipart body that carries `chat_id`,
    /// `caption` and `photo`.
    fn send_photo(&self, payload: OutboundPayload) -> impl Future<Output = Result<(), Error>> + Send;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client over hyper with rustls.
pub struct TelegramClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    send_message_url: String,
    send_photo_url: String,
}

impl TelegramClient {
    pub fn new(config: &RelayConfig) -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            send_message_url: config.method_url(SEND_MESSAGE),
            send_photo_url: config.method_url(SEND_PHOTO),
        }
    }

    async fn post(
        &self,
        api_method: &str,
        url: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), Error> {
        log::debug!("Calling {} with {} bytes", api_method, body.len());

        let req = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(body))?;

        let resp = self.client.request(req).await?;
        let status = resp.status();
        let reply = resp.into_body().collect().await?.to_bytes();

        check_reply(api_method, status, &reply)
    }
}

impl MessagingApi for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), Error> {
        let body = serde_json::to_vec(&SendMessage { chat_id, text })?;

        self.post(SEND_MESSAGE, &self.send_message_url, "application/json", body.into())
            .await
    }

    async fn send_photo(&self, payload: OutboundPayload) -> Result<(), Error> {
        let content_type = payload.content_type();

        self.post(SEND_PHOTO, &self.send_photo_url, &content_type, payload.into_body())
            .await
    }
}

/// A call succeeded only when the status is 2xx and the reply says `"ok": true`.
fn check_reply(api_method: &str, status: StatusCode, reply: &[u8]) -> Result<(), Error> {
    let parsed = serde_json::from_slice::<ApiReply>(reply);

    match parsed {
        Ok(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
        Ok(ApiReply { description: Some(description), .. }) => {
            log::warn!("{} refused with {}: {}", api_method, status, description);
            Err(Error::upstream(description))
        }
        other => {
            if let Err(e) = other {
                log::warn!("{} returned {} with an unreadable reply: {}", api_method, status, e);
            }
            Err(Error::upstream(format!("Telegram {} failed", api_method)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_reply() {
        let reply = br#"{"ok":true,"result":{"message_id":7}}"#;
        assert!(check_reply(SEND_MESSAGE, StatusCode::OK, reply).is_ok());
    }

    #[test]
    fn refused_reply_uses_description() {
        let reply = br#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;

        match check_reply(SEND_PHOTO, StatusCode::BAD_REQUEST, reply) {
            Err(Error::Upstream(msg)) => assert_eq!("Bad Request: chat not found", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn refused_reply_without_description() {
        match check_reply(SEND_MESSAGE, StatusCode::OK, br#"{"ok":false}"#) {
            Err(Error::Upstream(msg)) => assert_eq!("Telegram sendMessage failed", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_status_with_ok_body_fails() {
        let res = check_reply(SEND_PHOTO, StatusCode::BAD_GATEWAY, br#"{"ok":true}"#);
        assert!(matches!(res, Err(Error::Upstream(_))));
    }

    #[test]
    fn unreadable_reply_fails() {
        match check_reply(SEND_PHOTO, StatusCode::OK, b"<html>gateway</html>") {
            Err(Error::Upstream(msg)) => assert_eq!("Telegram sendPhoto failed", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn message_body_shape() {
        let body = serde_json::to_value(SendMessage {
            chat_id: "-100",
            text: "hello",
        })
        .unwrap();

        assert_eq!(serde_json::json!({"chat_id": "-100", "text": "hello"}), body);
    }
}
