use crate::{
    config::RelayConfig,
    encoder,
    extract::{extract, ExtractedFields},
    inbound::InboundForm,
    telegram::MessagingApi,
    Error,
};

/// Text fields read from a submitted order form.
pub const TEXT_FIELDS: &[&str] = &["acc_name", "phone", "link"];
/// The optional file field of the order form.
pub const FILE_FIELD: &str = "proof";

/// Which call was made for a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No file was submitted, the order went out as a text message.
    Message,
    /// The order went out as a photo with the order text as caption.
    Photo,
    /// A file field was submitted without any bytes, so only the text was sent.
    MessageWithoutFile,
}

impl RelayOutcome {
    pub fn note(&self) -> Option<&'static str> {
        match *self {
            RelayOutcome::MessageWithoutFile => Some("no file detected"),
            _ => None,
        }
    }
}

pub struct Relay<A> {
    config: RelayConfig,
    api: A,
}

impl<A> Relay<A>
where
    A: MessagingApi,
{
    pub fn new(config: RelayConfig, api: A) -> Self {
        Self { config, api }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Renders the order summary sent as message text or photo caption.
    pub fn order_text(&self, fields: &ExtractedFields) -> String {
        let mut text = format!(
            "🧾 {}\n• Acc: {}\n• Phone: {}\n• Link: {}",
            self.config.order_title,
            fields.get("acc_name"),
            fields.get("phone"),
            fields.get("link"),
        );

        if let Some(ref note) = self.config.payment_note {
            text.push_str("\n• Payment: ");
            text.push_str(note);
        }

        text
    }

    /// Decodes a submitted form and relays it. At most one outbound call is made.
    pub async fn relay_form(&self, form: &InboundForm) -> Result<RelayOutcome, Error> {
        let parts = form.decode()?;
        let fields = extract(&parts, TEXT_FIELDS, FILE_FIELD);

        self.dispatch(&fields).await
    }

    /// Sends a text message when there is no attachment, otherwise a photo
    /// captioned with the same text.
    pub async fn dispatch(&self, fields: &ExtractedFields) -> Result<RelayOutcome, Error> {
        let text = self.order_text(fields);
        let chat_id = self.config.chat_id.as_str();

        match fields.attachment() {
            None => {
                self.api.send_message(chat_id, &text).await?;
                Ok(RelayOutcome::Message)
            }

            Some(attachment) if attachment.is_empty() => {
                log::warn!(
                    "File field {:?} carried no bytes, sending text only",
                    attachment.filename()
                );
                self.api.send_message(chat_id, &text).await?;
                Ok(RelayOutcome::MessageWithoutFile)
            }

            Some(attachment) => {
                let payload = encoder::encode(
                    &[("chat_id", chat_id), ("caption", text.as_str())],
                    Some(attachment),
                );

                log::debug!(
                    "Relaying {} ({}, {} bytes)",
                    attachment.filename(),
                    attachment.content_type(),
                    attachment.len()
                );

                self.api.send_photo(payload).await?;
                Ok(RelayOutcome::Photo)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoder::{Attachment, OutboundPayload};
    use crate::parser::decode;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Message { chat_id: String, text: String },
        Photo { boundary: String, body: Bytes },
    }

    /// Records every call and answers with `reject` when set.
    #[derive(Default)]
    pub(crate) struct RecordingApi {
        pub(crate) calls: Mutex<Vec<Call>>,
        pub(crate) reject: Option<String>,
    }

    impl RecordingApi {
        pub(crate) fn rejecting(msg: &str) -> Self {
            Self {
                reject: Some(msg.to_string()),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self) -> Result<(), Error> {
            match self.reject {
                Some(ref msg) => Err(Error::upstream(msg.clone())),
                None => Ok(()),
            }
        }
    }

    impl MessagingApi for RecordingApi {
        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), Error> {
            self.calls.lock().unwrap().push(Call::Message {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
            });
            self.answer()
        }

        async fn send_photo(&self, payload: OutboundPayload) -> Result<(), Error> {
            self.calls.lock().unwrap().push(Call::Photo {
                boundary: payload.boundary().to_string(),
                body: payload.into_body(),
            });
            self.answer()
        }
    }

    pub(crate) fn relay(api: RecordingApi) -> Relay<RecordingApi> {
        Relay::new(RelayConfig::new("token", "-100200"), api)
    }

    fn fields(attachment: Option<Attachment>) -> ExtractedFields {
        let mut body = String::new();
        for (name, value) in &[("acc_name", "Aung"), ("phone", "0977"), ("link", "t.me/a")] {
            body.push_str(&format!(
                "--B\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                name, value
            ));
        }

        let mut body = body.into_bytes();
        if let Some(a) = attachment {
            body.extend_from_slice(
                format!(
                    "--B\r\nContent-Disposition: form-data; name=\"proof\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    a.filename(),
                    a.content_type()
                )
                .as_bytes(),
            );
            body.extend_from_slice(a.bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--B--\r\n");

        let parts = decode(&Bytes::from(body), "B").unwrap();
        extract(&parts, TEXT_FIELDS, FILE_FIELD)
    }

    #[test]
    fn order_text_template() {
        let mut relay = relay(RecordingApi::default());
        let text = relay.order_text(&fields(None));
        assert_eq!("🧾 New Order\n• Acc: Aung\n• Phone: 0977\n• Link: t.me/a", text);

        relay.config.payment_note = Some("Kpay".to_string());
        let text = relay.order_text(&fields(None));
        assert!(text.ends_with("\n• Link: t.me/a\n• Payment: Kpay"));
    }

    #[tokio::test]
    async fn text_only_form_sends_message() {
        let relay = relay(RecordingApi::default());

        let outcome = relay.dispatch(&fields(None)).await.unwrap();

        assert_eq!(RelayOutcome::Message, outcome);
        assert_eq!(None, outcome.note());
        assert_eq!(
            vec![Call::Message {
                chat_id: "-100200".to_string(),
                text: relay.order_text(&fields(None)),
            }],
            relay.api().calls()
        );
    }

    #[tokio::test]
    async fn file_form_sends_photo_with_same_bytes() {
        let relay = relay(RecordingApi::default());
        let mut jpeg = vec![0xff, 0xd8, 0xff];
        jpeg.extend_from_slice(b"--b\r\n\r\n--");
        jpeg.extend(0u8..=255);
        let attachment = Attachment::new("p.jpg", "image/jpeg", jpeg.clone());

        let outcome = relay.dispatch(&fields(Some(attachment))).await.unwrap();
        assert_eq!(RelayOutcome::Photo, outcome);

        let calls = relay.api().calls();
        assert_eq!(1, calls.len());

        let (boundary, body) = match &calls[0] {
            Call::Photo { boundary, body } => (boundary.clone(), body.clone()),
            other => panic!("unexpected {:?}", other),
        };

        let sent = decode(&body, &boundary).unwrap();
        let names: Vec<&str> = sent.iter().map(|p| p.name()).collect();
        assert_eq!(vec!["chat_id", "caption", "photo"], names);
        assert_eq!("-100200", sent[0].text());
        assert_eq!(relay.order_text(&fields(None)), sent[1].text());
        assert_eq!(Some("p.jpg"), sent[2].filename());
        assert_eq!(&jpeg[..], sent[2].body());
    }

    #[tokio::test]
    async fn empty_file_falls_back_to_message() {
        let relay = relay(RecordingApi::default());
        let attachment = Attachment::new("p.jpg", "image/jpeg", Bytes::new());

        let outcome = relay.dispatch(&fields(Some(attachment))).await.unwrap();

        assert_eq!(RelayOutcome::MessageWithoutFile, outcome);
        assert_eq!(Some("no file detected"), outcome.note());
        assert!(matches!(relay.api().calls()[..], [Call::Message { .. }]));
    }

    #[tokio::test]
    async fn upstream_refusal_is_returned() {
        let relay = relay(RecordingApi::rejecting("Forbidden: bot was blocked"));

        match relay.dispatch(&fields(None)).await {
            Err(Error::Upstream(msg)) => assert_eq!("Forbidden: bot was blocked", msg),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(1, relay.api().calls().len());
    }
}
