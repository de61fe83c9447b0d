use crate::{Error, Part};
use bytes::Bytes;

const CRLF: &[u8] = &[13, 10]; // "\r\n"
const BOUNDARY_LAST_PART_SENTINEL: &[u8] = &[45, 45]; // "--"

/// Reads the boundary token out of a `multipart/form-data` content type value.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, Error> {
    let mime_type = match content_type.trim().parse::<mime::Mime>() {
        Ok(m) => m,
        Err(e) => return raw_boundary(content_type).ok_or(Error::InvalidMimeType(e))?,
    };

    if mime_type.type_() != mime::MULTIPART || mime_type.subtype() != mime::FORM_DATA {
        return Err(Error::NotMultipart);
    }

    match mime_type.get_param(mime::BOUNDARY) {
        Some(boundary) => {
            let boundary = boundary.as_str().trim_matches('"');
            if boundary.is_empty() {
                return Err(Error::BoundaryMissing);
            }
            Ok(boundary.to_string())
        }

        None => Err(Error::BoundaryMissing),
    }
}

/// Boundaries may hold characters `mime` rejects in an unquoted token,
/// such as `/`, `=`, `?` or `:`. Reads such a value straight off the
/// `boundary=` parameter. `None` when the media type is not
/// `multipart/form-data` or there is no such parameter.
fn raw_boundary(content_type: &str) -> Option<Result<String, Error>> {
    let mut params = content_type.split(';');
    let media_type = params.next()?.trim();

    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }

        let boundary = value.trim().trim_matches('"');
        if boundary.is_empty() {
            Some(Err(Error::BoundaryMissing))
        } else {
            Some(Ok(boundary.to_string()))
        }
    })
}

/// Splits a complete multipart body into its parts.
///
/// The preamble before the first delimiter and everything after the closing
/// `--<boundary>--` are ignored, as are segments holding nothing but line
/// terminators. A part without a Content-Disposition name fails the whole
/// decode. Parts hold slices of `body`, which is never modified.
pub fn decode(body: &Bytes, boundary: &str) -> Result<Vec<Part>, Error> {
    if boundary.is_empty() {
        return Err(Error::BoundaryMissing);
    }

    let parts = BoundaryParser::new(body.clone(), boundary)
        .filter(|segment| !is_blank(segment))
        .map(Part::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Decoded {} parts from {} bytes", parts.len(), body.len());

    Ok(parts)
}

fn is_blank(segment: &[u8]) -> bool {
    segment.iter().all(|b| matches!(b, b'\r' | b'\n' | b' ' | b'\t'))
}

/// Iterator over the raw segments between `--<boundary>` delimiters.
///
/// Each segment starts after the line terminator that follows its
/// delimiter and runs up to the next delimiter, so it still carries the
/// line terminator that preceded that delimiter.
#[derive(Debug)]
pub(crate) struct BoundaryParser {
    boundary: String,
    buffer: Bytes,
    pos: usize,
    started: bool,
    done: bool,
}

impl BoundaryParser {
    pub fn new<S: AsRef<str>>(buffer: Bytes, boundary: S) -> Self {
        let boundary = format!("--{}", boundary.as_ref());

        log::debug!("Creating with boundary: {:?}", boundary);

        Self {
            boundary,
            buffer,
            pos: 0,
            started: false,
            done: false,
        }
    }

    fn find_boundary(&self, from: usize) -> Option<usize> {
        twoway::find_bytes(&self.buffer[from..], self.boundary.as_bytes()).map(|i| from + i)
    }
}

impl Iterator for BoundaryParser {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.done {
            return None;
        }

        let boundary_len = self.boundary.len();

        if !self.started {
            // Find the start, might have to skip the preamble. It is to be discarded.
            match self.find_boundary(0) {
                Some(i) => {
                    self.pos = i + boundary_len;
                    self.started = true;
                }
                None => {
                    log::debug!("No boundary found in {} bytes", self.buffer.len());
                    self.done = true;
                    return None;
                }
            }
        }

        let rest = &self.buffer[self.pos..];

        if rest.starts_with(BOUNDARY_LAST_PART_SENTINEL) {
            log::debug!("Found stop sentinel at index: {}", self.pos);
            self.done = true;
            return None;
        }

        // Transport padding may sit between the delimiter and its line break.
        let padding = rest.iter().take_while(|b| matches!(b, b' ' | b'\t')).count();
        let rest = &rest[padding..];
        let mut part_start = self.pos + padding;

        if rest.starts_with(CRLF) {
            part_start += 2;
        } else if rest.starts_with(b"\n") {
            part_start += 1;
        }

        match self.find_boundary(part_start) {
            Some(i) => {
                self.pos = i + boundary_len;
                Some(self.buffer.slice(part_start..i))
            }

            None => {
                // No closing delimiter, the remainder is the last part.
                log::debug!("Body ended without a closing boundary");
                self.done = true;
                Some(self.buffer.slice(part_start..))
            }
        }
    }
}
