use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::{canonical::UrlParts, error::AppError};

pub type FeatureMap = HashMap<String, f64>;

/// Every key the featurizer emits. Several are legacy duplicates kept so that
/// schemas from older training runs still line up.
pub const FEATURE_NAMES: [&str; 21] = [
    "count-www",
    "count@",
    "count_dir",
    "count_embed_domian",
    "short_url",
    "count-https",
    "count-http",
    "count%",
    "count?",
    "count-",
    "count=",
    "url_length",
    "hostname_length",
    "sus_url",
    "count-digits",
    "count-letters",
    "count_dot",
    "tld_length",
    "no_of_dir",
    "no_of_embed",
    "count_www",
];

// Duplicates are intentional: this is the list the model was trained with.
const SHORTENING_SERVICES: &[&str] = &[
    "bit.ly", "goo.gl", "shorte.st", "go2l.ink", "x.co", "ow.ly", "t.co", "tinyurl", "tr.im",
    "is.gd", "cli.gs", "yfrog.com", "migre.me", "ff.im", "tiny.cc", "url4.eu", "twit.ac", "su.pr",
    "twurl.nl", "snipurl.com", "short.to", "BudURL.com", "ping.fm", "post.ly", "Just.as",
    "bkite.com", "snipr.com", "fic.kr", "loopt.us", "doiop.com", "short.ie", "kl.am", "wp.me",
    "rubyurl.com", "om.ly", "to.ly", "bit.do", "t.co", "lnkd.in", "db.tt", "qr.ae", "adf.ly",
    "goo.gl", "bitly.com", "cur.lv", "tinyurl.com", "ow.ly", "bit.ly", "ity.im", "q.gs", "is.gd",
    "po.st", "bc.vc", "twitthis.com", "u.to", "j.mp", "buzurl.com", "cutt.us", "u.bb",
    "yourls.org", "x.co", "prettylinkpro.com", "scrnch.me", "filoops.info", "vzturl.com",
    "qr.net", "1url.com", "tweez.me", "v.gd", "tr.im", "link.zip.net",
];

const SUSPICIOUS_WORDS: &[&str] = &[
    "PayPal", "login", "signin", "bank", "account", "update", "free", "lucky", "service", "bonus",
    "ebayisapi", "webscr",
];

/// Han ideographs with a numeric value. They are letters by general
/// category but count as numeric characters, like the `N` categories.
const HAN_NUMERALS: [char; 81] = [
    '\u{3405}', '\u{3483}', '\u{382A}', '\u{3B4D}', '\u{4E00}', '\u{4E03}', '\u{4E07}', '\u{4E09}',
    '\u{4E5D}', '\u{4E8C}', '\u{4E94}', '\u{4E96}', '\u{4EBF}', '\u{4EC0}', '\u{4EDF}', '\u{4EE8}',
    '\u{4F0D}', '\u{4F70}', '\u{5104}', '\u{5146}', '\u{5169}', '\u{516B}', '\u{516D}', '\u{5341}',
    '\u{5343}', '\u{5344}', '\u{5345}', '\u{534C}', '\u{53C1}', '\u{53C2}', '\u{53C3}', '\u{53C4}',
    '\u{56DB}', '\u{58F1}', '\u{58F9}', '\u{5E7A}', '\u{5EFE}', '\u{5EFF}', '\u{5F0C}', '\u{5F0D}',
    '\u{5F0E}', '\u{5F10}', '\u{62FE}', '\u{634C}', '\u{67D2}', '\u{6F06}', '\u{7396}', '\u{767E}',
    '\u{8086}', '\u{842C}', '\u{8CAE}', '\u{8CB3}', '\u{8D30}', '\u{9621}', '\u{9646}', '\u{964C}',
    '\u{9678}', '\u{96F6}', '\u{F96B}', '\u{F973}', '\u{F978}', '\u{F9B2}', '\u{F9D1}', '\u{F9D3}',
    '\u{F9FD}', '\u{20001}', '\u{20064}', '\u{200E2}', '\u{20121}', '\u{2092A}', '\u{20983}',
    '\u{2098C}', '\u{2099C}', '\u{20AEA}', '\u{20AFD}', '\u{20B19}', '\u{22390}', '\u{22998}',
    '\u{23B1B}', '\u{2626D}', '\u{2F890}',
];

/// Output of a featurizer. Named output is matched against the schema by
/// column name; positional output must already be in schema order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedFeatures {
    Named(FeatureMap),
    Positional(Vec<f64>),
}

/// Turns a URL into features. Implementations must not fail on any input
/// they are given; an error here is reported to the caller, never retried.
pub trait Featurizer: Send + Sync {
    fn extract(&self, url: &str) -> Result<ExtractedFeatures, AppError>;
}

/// Lexical URL featurizer. Holds the compiled indicator patterns; build it
/// once and share it.
#[derive(Debug, Clone)]
pub struct UrlFeaturizer {
    shortening: Regex,
    suspicious: Regex,
    letters: Regex,
    numerals: Regex,
}

impl UrlFeaturizer {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            shortening: literal_alternation(SHORTENING_SERVICES)?,
            suspicious: literal_alternation(SUSPICIOUS_WORDS)?,
            letters: Regex::new(r"\p{L}")?,
            numerals: numeral_class()?,
        })
    }

    /// Computes every feature in [`FEATURE_NAMES`]. Total over all strings.
    pub fn feature_map(&self, url: &str) -> FeatureMap {
        let parts = UrlParts::split(url);
        let www = count(url, "www");

        let values: [f64; 21] = [
            www,
            count(url, "@"),
            count(parts.path, "/"),
            count(parts.path, "//"),
            self.shortening_indicator(url),
            count(url, "https"),
            count(url, "http"),
            count(url, "%"),
            count(url, "?"),
            count(url, "-"),
            count(url, "="),
            url.chars().count() as f64,
            parts.netloc.chars().count() as f64,
            self.suspicious_indicator(url),
            self.numerals.find_iter(url).count() as f64,
            self.letters.find_iter(url).count() as f64,
            count(url, "."),
            tld_length(&parts.hostname()),
            count(url, "/"),
            count(parts.path, "//"),
            www,
        ];

        FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    pub fn shortening_indicator(&self, url: &str) -> f64 {
        if self.shortening.is_match(url) { 1.0 } else { 0.0 }
    }

    pub fn suspicious_indicator(&self, url: &str) -> f64 {
        if self.suspicious.is_match(url) { 1.0 } else { 0.0 }
    }
}

impl Featurizer for UrlFeaturizer {
    fn extract(&self, url: &str) -> Result<ExtractedFeatures, AppError> {
        Ok(ExtractedFeatures::Named(self.feature_map(url)))
    }
}

fn literal_alternation(terms: &[&str]) -> Result<Regex, AppError> {
    let pattern = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
}

/// Any `N` category character or a Han numeral.
fn numeral_class() -> Result<Regex, AppError> {
    let han: String = HAN_NUMERALS.iter().collect();
    Ok(Regex::new(&format!(r"[\p{{N}}{han}]"))?)
}

/// Non-overlapping occurrences, like `str::matches`.
fn count(haystack: &str, needle: &str) -> f64 {
    haystack.matches(needle).count() as f64
}

fn tld_length(hostname: &str) -> f64 {
    match hostname.rsplit_once('.') {
        Some((_, tld)) => tld.chars().count() as f64,
        None => 0.0,
    }
}
