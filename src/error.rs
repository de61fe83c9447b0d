use http::StatusCode;
use std::{error::Error as StdError, fmt};

#[derive(Debug)]
pub enum Error {
    /// Only POST submissions are relayed.
    MethodNotAllowed,
    ContentTypeMissing,
    NotMultipart,
    InvalidMimeType(mime::FromStrError),
    /// The content type has no `boundary` parameter, or it is empty.
    BoundaryMissing,
    InvalidTransferEncoding(base64::DecodeError),
    BodyTooLarge(usize),
    MalformedMultipart(String),
    /// Required configuration is missing or unusable.
    Config(String),
    /// The messaging API rejected the call.
    Upstream(String),
    InnerStream(String),
}

impl Error {
    pub(crate) fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::MalformedMultipart(msg.into())
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn upstream<S: Into<String>>(msg: S) -> Self {
        Error::Upstream(msg.into())
    }

    pub(crate) fn inner<E: fmt::Display>(e: E) -> Self {
        Error::InnerStream(format!("{}", e))
    }

    /// The status code reported back to the submitting client.
    pub fn status(&self) -> StatusCode {
        match *self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::ContentTypeMissing
            | Error::NotMultipart
            | Error::InvalidMimeType(_)
            | Error::BoundaryMissing
            | Error::InvalidTransferEncoding(_) => StatusCode::BAD_REQUEST,
            Error::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::MalformedMultipart(_)
            | Error::Config(_)
            | Error::Upstream(_)
            | Error::InnerStream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MethodNotAllowed => write!(f, "Method not allowed"),
            Error::ContentTypeMissing | Error::NotMultipart => {
                write!(f, "Expected multipart/form-data")
            }
            Error::InvalidMimeType(ref e) => write!(f, "Content-Type value invalid: {}", e),
            Error::BoundaryMissing => write!(f, "Content-Type is missing the multipart boundary"),
            Error::InvalidTransferEncoding(ref e) => {
                write!(f, "Body is not valid base64: {}", e)
            }
            Error::BodyTooLarge(limit) => write!(f, "Body exceeds the limit of {} bytes", limit),
            Error::MalformedMultipart(ref msg) => write!(f, "Malformed Multipart: {}", msg),
            Error::Config(ref msg) => write!(f, "Server config missing: {}", msg),
            Error::Upstream(ref msg) => write!(f, "{}", msg),
            Error::InnerStream(ref e) => write!(f, "InnerStream: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::InvalidMimeType(ref e) => Some(e),
            Error::InvalidTransferEncoding(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(inner: hyper::Error) -> Self {
        Error::InnerStream(format!("Hyper error: {}", inner))
    }
}

impl From<hyper_util::client::legacy::Error> for Error {
    fn from(inner: hyper_util::client::legacy::Error) -> Self {
        Error::InnerStream(format!("Client error: {}", inner))
    }
}

impl From<std::io::Error> for Error {
    fn from(inner: std::io::Error) -> Self {
        Error::InnerStream(format!("Io error: {}", inner))
    }
}

impl From<http::Error> for Error {
    fn from(inner: http::Error) -> Self {
        Error::InnerStream(format!("Http error: {}", inner))
    }
}

impl From<serde_json::Error> for Error {
    fn from(inner: serde_json::Error) -> Self {
        Error::InnerStream(format!("Json error: {}", inner))
    }
}

impl From<mime::FromStrError> for Error {
    fn from(inner: mime::FromStrError) -> Self {
        Error::InvalidMimeType(inner)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(inner: base64::DecodeError) -> Self {
        Error::InvalidTransferEncoding(inner)
    }
}
