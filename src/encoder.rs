use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Field name the attachment is sent under.
pub const PHOTO_FIELD: &str = "photo";

const BOUNDARY_PREFIX: &str = "----formrelay";
const BOUNDARY_RANDOM_BYTES: usize = 12;
const MAX_BOUNDARY_ATTEMPTS: usize = 8;
const CRLF: &[u8] = b"\r\n";

/// The single file relayed along with the text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: String,
    bytes: Bytes,
}

impl Attachment {
    pub fn new<F, C, B>(filename: F, content_type: C, bytes: B) -> Self
    where
        F: Into<String>,
        C: Into<String>,
        B: Into<Bytes>,
    {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An encoded multipart body together with the boundary it was framed with.
#[derive(Debug, Clone)]
pub struct OutboundPayload {
    boundary: String,
    body: Bytes,
}

impl OutboundPayload {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Value for the Content-Type header of the request carrying this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Encodes text fields, in the given order, followed by the attachment.
///
/// A fresh boundary is generated for every call. Candidates that occur
/// inside any field value or the attachment bytes are thrown away.
pub fn encode(fields: &[(&str, &str)], attachment: Option<&Attachment>) -> OutboundPayload {
    let mut boundary = generate_boundary();

    for _ in 1..MAX_BOUNDARY_ATTEMPTS {
        if !collides(&boundary, fields, attachment) {
            break;
        }
        log::debug!("Boundary {} found in payload, generating another", boundary);
        boundary = generate_boundary();
    }

    encode_with_boundary(&boundary, fields, attachment)
}

/// Like [`encode`] with a caller supplied boundary.
pub fn encode_with_boundary(
    boundary: &str,
    fields: &[(&str, &str)],
    attachment: Option<&Attachment>,
) -> OutboundPayload {
    let capacity = fields
        .iter()
        .map(|(k, v)| k.len() + v.len() + boundary.len() + 64)
        .sum::<usize>()
        + attachment.map(|a| a.len() + a.filename.len() + 128).unwrap_or(0)
        + boundary.len()
        + 8;

    let mut buf = BytesMut::with_capacity(capacity);

    for (name, value) in fields {
        put_delimiter(&mut buf, boundary);
        buf.put_slice(format!("Content-Disposition: form-data; name=\"{}\"", name).as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(CRLF);
        buf.put_slice(value.as_bytes());
        buf.put_slice(CRLF);
    }

    if let Some(attachment) = attachment {
        put_delimiter(&mut buf, boundary);
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                PHOTO_FIELD,
                header_safe_filename(&attachment.filename)
            )
            .as_bytes(),
        );
        buf.put_slice(CRLF);
        buf.put_slice(format!("Content-Type: {}", attachment.content_type).as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(CRLF);
        buf.put_slice(&attachment.bytes);
        buf.put_slice(CRLF);
    }

    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"--");
    buf.put_slice(CRLF);

    OutboundPayload {
        boundary: boundary.to_string(),
        body: buf.freeze(),
    }
}

fn put_delimiter(buf: &mut BytesMut, boundary: &str) {
    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(CRLF);
}

fn collides(boundary: &str, fields: &[(&str, &str)], attachment: Option<&Attachment>) -> bool {
    let needle = boundary.as_bytes();

    fields
        .iter()
        .any(|(_, v)| twoway::find_bytes(v.as_bytes(), needle).is_some())
        || attachment
            .map(|a| twoway::find_bytes(&a.bytes, needle).is_some())
            .unwrap_or(false)
}

/// Quotes and line breaks would end the header value early.
fn header_safe_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect::<String>()
        .replace('"', "%22")
}

/// A boundary with a random hex suffix.
pub fn generate_boundary() -> String {
    let mut random = [0u8; BOUNDARY_RANDOM_BYTES];

    let suffix = match getrandom::getrandom(&mut random) {
        Ok(()) => hex::encode(random),
        Err(e) => {
            log::warn!("getrandom failed, using a clock based boundary: {}", e);
            clock_suffix()
        }
    };

    format!("{}{}", BOUNDARY_PREFIX, suffix)
}

fn clock_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    format!("{:016x}{:08x}", nanos, COUNTER.fetch_add(1, Ordering::Relaxed))
}
