use bytes::Bytes;

use crate::Error;

/// Content type assumed for a file part that does not declare one.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "image/jpeg";

const CRLF: &[u8] = b"\r\n";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const BARE_HEADER_SEPARATOR: &[u8] = b"\n\n";

/// One segment of a multipart body. Header block and body are slices
/// of the buffer that was decoded, nothing is copied.
#[derive(Debug, Clone)]
pub struct Part {
    headers_data: Bytes,
    body_data: Bytes,
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
}

impl Part {
    /// The `name` attribute of the Content-Disposition header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `filename` attribute, present only for file parts. It may be
    /// empty, which is what browsers send when no file was chosen.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Declared content type of a file part, falling back to
    /// [`DEFAULT_FILE_CONTENT_TYPE`]. Text parts have none.
    pub fn content_type(&self) -> Option<&str> {
        if !self.is_file() {
            return None;
        }

        Some(
            self.content_type
                .as_deref()
                .unwrap_or(DEFAULT_FILE_CONTENT_TYPE),
        )
    }

    pub fn body(&self) -> &[u8] {
        &self.body_data
    }

    /// The body as a shared handle on the decoded buffer.
    pub fn body_bytes(&self) -> Bytes {
        self.body_data.clone()
    }

    pub fn into_body(self) -> Bytes {
        self.body_data
    }

    pub fn body_len(&self) -> usize {
        self.body_data.len()
    }

    /// The body as text, replacing invalid sequences. Meant for text
    /// fields only, file bodies should be taken as bytes.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_data).into_owned()
    }

    /// Returns an iterator over all the headers lines, with their line endings trimmed.
    pub fn header_lines(&self) -> impl Iterator<Item = Result<&str, std::str::Utf8Error>> {
        let slice = &self.headers_data;
        slice
            .split(|e| *e == b'\n')
            .map(|line| std::str::from_utf8(line).map(|s| s.trim()))
            .filter(|line| line.as_ref().map(|s| !s.is_empty()).unwrap_or(true))
    }
}

impl TryFrom<Bytes> for Part {
    type Error = Error;

    /// Splits a segment into header block and body and reads the
    /// Content-Disposition and Content-Type headers. The segment starts
    /// right after the delimiter line.
    fn try_from(segment: Bytes) -> Result<Self, Error> {
        let (headers_data, mut body_data) = split_headers(segment);

        if body_data.ends_with(CRLF) {
            body_data.truncate(body_data.len() - 2);
        } else if body_data.ends_with(b"\n") {
            body_data.truncate(body_data.len() - 1);
        }

        let (name, filename, content_type) = read_headers(&headers_data);

        let name = name.ok_or_else(|| {
            Error::malformed("part has no name in its Content-Disposition header")
        })?;

        Ok(Part {
            headers_data,
            body_data,
            name,
            filename,
            content_type,
        })
    }
}

/// Reads `name` and `filename` from Content-Disposition and the
/// Content-Type value out of a header block.
fn read_headers(headers: &[u8]) -> (Option<String>, Option<String>, Option<String>) {
    let header_text = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for (header, value) in header_text.lines().filter_map(parse_header_line) {
        if header.eq_ignore_ascii_case("content-disposition") {
            for (key, param) in disposition_params(value) {
                match key.as_str() {
                    "name" if name.is_none() => name = Some(param),
                    "filename" if filename.is_none() => filename = Some(param),
                    _ => {}
                }
            }
        } else if header.eq_ignore_ascii_case("content-type") && !value.is_empty() {
            content_type = Some(value.to_string());
        }
    }

    (name, filename, content_type)
}

fn split_headers(mut bs: Bytes) -> (Bytes, Bytes) {
    // A blank line right away means there are no headers.
    if bs.starts_with(CRLF) {
        return (Bytes::new(), bs.split_off(CRLF.len()));
    }

    // The earliest separator ends the headers, the body may contain either.
    let crlf = twoway::find_bytes(&bs[..], HEADER_SEPARATOR).map(|i| (i, HEADER_SEPARATOR.len()));
    let lf = twoway::find_bytes(&bs[..], BARE_HEADER_SEPARATOR)
        .map(|i| (i, BARE_HEADER_SEPARATOR.len()));

    let found = match (crlf, lf) {
        (Some(c), Some(l)) if l.0 < c.0 => Some(l),
        (Some(c), _) => Some(c),
        (None, l) => l,
    };

    match found {
        // Everything is headers, the body is empty.
        None => (bs, Bytes::new()),
        Some((i, sep_len)) => {
            let headers = bs.split_to(i);
            let body = bs.split_off(sep_len);
            (headers, body)
        }
    }
}

fn parse_header_line(s: &str) -> Option<(&str, &str)> {
    let (name, value) = s.split_once(':')?;
    let name = name.trim();

    if name.is_empty() {
        return None;
    }

    Some((name, value.trim()))
}

/// Parameters of a Content-Disposition value, keys lowercased and values
/// unquoted. Semicolons inside quotes do not split.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => {
                pieces.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&value[start..]);

    pieces
        .into_iter()
        .filter_map(|piece| {
            let (key, val) = piece.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(val.trim()).to_string()))
        })
        .collect()
}

fn unquote(s: &str) -> &str {
    for q in &['"', '\''] {
        if s.len() >= 2 && s.starts_with(*q) && s.ends_with(*q) {
            return &s[1..s.len() - 1];
        }
    }

    s
}

#[cfg(test)]
mod tests {

    use super::*;

    fn part(s: &'static str) -> Result<Part, Error> {
        Part::try_from(Bytes::from_static(s.as_bytes()))
    }

    #[test]
    fn test_parse_header_lines() {
        let tests = [
            ("Content-Type: image/jpeg", "Content-Type", "image/jpeg"),
            ("Content-Length: 40669", "Content-Length", "40669"),
            (
                "content-disposition: form-data; name=\"a:b\"",
                "content-disposition",
                "form-data; name=\"a:b\"",
            ),
            ("X-TimeDiff:173", "X-TimeDiff", "173"),
        ];

        for (header, exp_name, exp_val) in &tests {
            let (name, val) = parse_header_line(header).expect("Parse header line");

            assert_eq!(exp_name, &name);
            assert_eq!(exp_val, &val);
        }

        assert_eq!(None, parse_header_line("no colon here"));
        assert_eq!(None, parse_header_line(": value"));
    }

    #[test]
    fn text_part() {
        let p = part("Content-Disposition: form-data; name=\"acc_name\"\r\n\r\nAung\r\n").unwrap();

        assert_eq!("acc_name", p.name());
        assert!(!p.is_file());
        assert_eq!(None, p.filename());
        assert_eq!(None, p.content_type());
        assert_eq!("Aung", p.text());
    }

    #[test]
    fn file_part_with_single_quotes_and_lowercase_headers() {
        let p = part(
            "content-disposition: form-data; name='proof'; filename='a;b.png'\r\n\
             content-type: image/png\r\n\r\nPNG\x00\x01\r\n",
        )
        .unwrap();

        assert_eq!("proof", p.name());
        assert_eq!(Some("a;b.png"), p.filename());
        assert_eq!(Some("image/png"), p.content_type());
        assert_eq!(b"PNG\x00\x01", p.body());
    }

    #[test]
    fn file_part_without_content_type_uses_default() {
        let p = part("Content-Disposition: form-data; name=proof; filename=x\r\n\r\nabc").unwrap();

        assert_eq!(Some("x"), p.filename());
        assert_eq!(Some(DEFAULT_FILE_CONTENT_TYPE), p.content_type());
        assert_eq!(3, p.body_len());
    }

    #[test]
    fn filename_does_not_shadow_name() {
        let p = part("Content-Disposition: form-data; filename=\"name.txt\"; name=\"doc\"\r\n\r\n")
            .unwrap();

        assert_eq!("doc", p.name());
        assert_eq!(Some("name.txt"), p.filename());
    }

    #[test]
    fn blank_value() {
        let p = part("Content-Disposition: form-data; name=\"link\"\r\n\r\n\r\n").unwrap();
        assert_eq!("", p.text());
        assert_eq!(0, p.body_len());
    }

    #[test]
    fn only_one_trailing_line_terminator_is_stripped() {
        let p = part("Content-Disposition: form-data; name=\"f\"; filename=\"f\"\r\n\r\nab\r\n\r\n")
            .unwrap();
        assert_eq!(b"ab\r\n", p.body());
    }

    #[test]
    fn lf_framed_part() {
        let p = part("Content-Disposition: form-data; name=\"acc_name\"\nContent-Type: text/plain\n\nAung\n")
            .unwrap();

        assert_eq!("acc_name", p.name());
        assert_eq!("Aung", p.text());
    }

    #[test]
    fn lf_framed_part_keeps_crlf_pairs_in_body() {
        let p = part(
            "Content-Disposition: form-data; name=\"proof\"; filename=\"a.bin\"\n\
             Content-Type: application/octet-stream\n\nAB\r\n\r\nCD\n",
        )
        .unwrap();

        assert_eq!(Some("a.bin"), p.filename());
        assert_eq!(Some("application/octet-stream"), p.content_type());
        assert_eq!(b"AB\r\n\r\nCD", p.body());
    }

    #[test]
    fn crlf_framed_part_keeps_lf_pairs_in_body() {
        let p = part("Content-Disposition: form-data; name=\"f\"; filename=\"f\"\r\n\r\nA\n\nB\r\n").unwrap();
        assert_eq!(b"A\n\nB", p.body());
    }

    #[test]
    fn missing_name_is_malformed() {
        let res = part("Content-Type: text/plain\r\n\r\nPart2\r\n");
        assert!(matches!(res, Err(Error::MalformedMultipart(_))));

        let res = part("\r\nPart1");
        assert!(matches!(res, Err(Error::MalformedMultipart(_))));
    }

    #[test]
    fn header_lines_are_trimmed() {
        let p = part(
            "Content-Disposition: form-data; name=\"a\"\r\nContent-Type: text/plain  \r\n\r\nx",
        )
        .unwrap();

        let lines: Vec<&str> = p.header_lines().map(|l| l.unwrap()).collect();
        assert_eq!(
            vec!["Content-Disposition: form-data; name=\"a\"", "Content-Type: text/plain"],
            lines
        );
    }
}
