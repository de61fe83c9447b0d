/// A header source, implemented for http::HeaderMap and for plain
/// name/value pairs. Lookups are case insensitive on the header name.
pub trait HeaderMap {
    fn get_value<K>(&self, header_key: K) -> Option<&str>
    where
        K: AsRef<str>;

    fn content_type(&self) -> Option<&str> {
        self.get_value("content-type")
    }

    /// True when the body was wrapped in base64 by the hosting layer
    /// and has to be decoded before parsing.
    fn is_base64_encoded(&self) -> bool {
        self.get_value("content-transfer-encoding")
            .map(|v| v.trim().eq_ignore_ascii_case("base64"))
            .unwrap_or(false)
    }
}

impl HeaderMap for http::header::HeaderMap {
    fn get_value<K>(&self, header_key: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.get(header_key.as_ref())
            .and_then(|hv| hv.to_str().ok())
    }
}

impl<'a> HeaderMap for [(&'a str, &'a str)] {
    fn get_value<K>(&self, header_key: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        let key = header_key.as_ref();
        self.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| *value)
    }
}
