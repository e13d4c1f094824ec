use std::fmt;

/// A navigation target: path plus ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteLocation {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RouteLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Parse `path?key=value&...`. A `#fragment` is dropped.
    pub fn parse(full_path: &str) -> Self {
        let without_fragment = full_path.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_fragment, ""),
        };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();

        Self {
            path: normalize_path(path),
            query,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Path with its query string, as used in `?redirect=` parameters.
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

impl fmt::Display for RouteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Leading slash, no trailing slash (except for the root).
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Percent-encode a query component. `/` and `:` stay readable so that
/// `redirect=/items` round-trips unchanged.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b':' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(value) => {
                        out.push(value);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_and_query() {
        let loc = RouteLocation::parse("/items?search=red%20drill&location_id=L1#top");
        assert_eq!(loc.path, "/items");
        assert_eq!(loc.query_value("search"), Some("red drill"));
        assert_eq!(loc.query_value("location_id"), Some("L1"));
        assert_eq!(loc.query_value("missing"), None);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(RouteLocation::parse("").path, "/");
        assert_eq!(RouteLocation::parse("/items/").path, "/items");
        assert_eq!(RouteLocation::parse("tags").path, "/tags");
    }

    #[test]
    fn test_full_path_keeps_slashes() {
        let loc = RouteLocation::new("/login").with_query("redirect", "/items");
        assert_eq!(loc.full_path(), "/login?redirect=/items");
        assert_eq!(loc.to_string(), "/login?redirect=/items");
    }

    #[test]
    fn test_nested_query_is_escaped() {
        let inner = RouteLocation::new("/items").with_query("search", "a&b");
        assert_eq!(inner.full_path(), "/items?search=a%26b");

        let outer = RouteLocation::new("/login").with_query("redirect", inner.full_path());
        assert_eq!(outer.full_path(), "/login?redirect=/items%3Fsearch%3Da%2526b");

        let parsed = RouteLocation::parse(&outer.full_path());
        assert_eq!(parsed.query_value("redirect"), Some("/items?search=a%26b"));
    }

    #[test]
    fn test_decode_invalid_escape_is_literal() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("a+b"), "a b");
    }
}
