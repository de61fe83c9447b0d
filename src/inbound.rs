use base64::Engine;
use bytes::Bytes;
use http::Method;

use crate::{parser, Error, HeaderMap, Part};

/// A submitted form that passed the protocol checks: the request was a
/// POST, declared `multipart/form-data` with a boundary, and its body is
/// raw multipart bytes.
#[derive(Debug, Clone)]
pub struct InboundForm {
    boundary: String,
    body: Bytes,
}

impl InboundForm {
    pub fn from_parts<H>(method: &Method, headers: &H, body: Bytes) -> Result<Self, Error>
    where
        H: HeaderMap + ?Sized,
    {
        if *method != Method::POST {
            return Err(Error::MethodNotAllowed);
        }

        let content_type = headers.content_type().ok_or(Error::ContentTypeMissing)?;
        let boundary = parser::boundary_from_content_type(content_type)?;

        let body = if headers.is_base64_encoded() {
            let encoded: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            let raw = base64::engine::general_purpose::STANDARD.decode(encoded)?;
            log::debug!("Decoded base64 body, {} -> {} bytes", body.len(), raw.len());
            Bytes::from(raw)
        } else {
            body
        };

        Ok(Self { boundary, body })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn decode(&self) -> Result<Vec<Part>, Error> {
        parser::decode(&self.body, &self.boundary)
    }
}
