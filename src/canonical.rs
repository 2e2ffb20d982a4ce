//! URL canonicalization.
//!
//! The canonical form of a URL is its lowercased hostname, minus one leading
//! `www.`, followed by the percent-decoded path. Query and fragment are
//! dropped. It is the common input for whitelist matching and feature
//! extraction, so two spellings of the same page score identically.

use std::borrow::Cow;

const DEFAULT_SCHEME: &str = "http://";

/// Components of a URL split the way `urlsplit` does it: no validation, no
/// normalization, every component borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UrlParts<'a> {
    pub scheme: &'a str,
    pub netloc: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    /// Never fails. A string that does not look like a URL ends up entirely
    /// in `path`.
    pub fn split(url: &'a str) -> Self {
        let mut parts = UrlParts::default();
        let mut rest = url;

        if let Some(i) = url.find(':') {
            let candidate = &url[..i];
            if candidate
                .as_bytes()
                .first()
                .is_some_and(|b| b.is_ascii_alphabetic())
                && candidate.bytes().all(is_scheme_byte)
            {
                parts.scheme = candidate;
                rest = &url[i + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after
                .find(|c| matches!(c, '/' | '?' | '#'))
                .unwrap_or(after.len());
            parts.netloc = &after[..end];
            rest = &after[end..];
        }

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        parts.path = path;
        parts.query = query;
        parts.fragment = fragment;
        parts
    }

    /// Host without userinfo, port or IPv6 brackets, lowercased. Empty when
    /// the URL has no network location or the brackets do not pair up.
    pub fn hostname(&self) -> String {
        let host_info = self.netloc.rsplit_once('@').map_or(self.netloc, |(_, h)| h);
        let host = match (host_info.find('['), host_info.find(']')) {
            (Some(open), Some(close)) if open < close => &host_info[open + 1..close],
            (None, None) => host_info.split_once(':').map_or(host_info, |(h, _)| h),
            // Unbalanced brackets: not a parseable host.
            _ => "",
        };
        host.to_lowercase()
    }
}

/// Schemes whose last path segment may carry `;params`.
const SCHEMES_WITH_PARAMS: &[&str] = &[
    "", "ftp", "hdl", "prospero", "http", "imap", "https", "shttp", "rtsp", "rtsps", "rtspu",
    "sip", "sips", "mms", "sftp", "tel",
];

/// Drops `;params` from the last path segment. A `;` in an earlier segment
/// is part of the path.
fn strip_params<'a>(scheme: &str, path: &'a str) -> &'a str {
    if !SCHEMES_WITH_PARAMS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
    {
        return path;
    }
    let last_segment = path.rfind('/').unwrap_or(0);
    match path[last_segment..].find(';') {
        Some(i) => &path[..last_segment + i],
        None => path,
    }
}

fn is_scheme_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')
}

/// Canonicalizes a raw URL. Malformed input degrades to empty components
/// instead of failing.
pub fn canonicalize(raw: &str) -> String {
    // Tabs and line breaks are dropped anywhere, even inside the host.
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect();
    let trimmed = cleaned.trim();
    let url: Cow<'_, str> = if trimmed.contains("://") {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{DEFAULT_SCHEME}{trimmed}"))
    };

    let parts = UrlParts::split(&url);
    let hostname = parts.hostname();
    let hostname = hostname.strip_prefix("www.").unwrap_or(&hostname);

    let path = strip_params(parts.scheme, parts.path);

    format!("{}{}", hostname, percent_decode(path))
}

/// Decodes `%XX` escapes. Malformed escapes are kept literally and byte
/// sequences that are not UTF-8 become U+FFFD.
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
