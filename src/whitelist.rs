use serde::Deserialize;

pub const SAFE_DOMAINS: [&str; 5] = [
    "wikipedia.org",
    "google.com",
    "youtube.com",
    "microsoft.com",
    "github.com",
];

/// How a canonical URL is compared against the safe domains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistMode {
    /// The host is a safe domain or one of its subdomains.
    #[default]
    Domain,
    /// The canonical URL contains a safe domain anywhere. Also matches hosts
    /// such as `wikipedia.org.attacker.com`.
    Substring,
}

#[derive(Debug, Clone)]
pub struct Whitelist {
    domains: Vec<String>,
    mode: WhitelistMode,
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::new(WhitelistMode::default(), Vec::new())
    }
}

impl Whitelist {
    /// Built-in safe domains plus `extra`.
    pub fn new(mode: WhitelistMode, extra: Vec<String>) -> Self {
        let mut domains: Vec<String> = SAFE_DOMAINS.iter().map(|d| d.to_string()).collect();
        for domain in extra {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        Self { domains, mode }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn mode(&self) -> WhitelistMode {
        self.mode
    }

    /// Expects a canonical URL: lowercase host directly followed by the path.
    pub fn is_whitelisted(&self, canonical: &str) -> bool {
        match self.mode {
            WhitelistMode::Substring => self.domains.iter().any(|d| canonical.contains(d.as_str())),
            WhitelistMode::Domain => {
                let host = canonical.split('/').next().unwrap_or_default();
                self.domains.iter().any(|d| {
                    host == d
                        || host
                            .strip_suffix(d.as_str())
                            .is_some_and(|prefix| prefix.ends_with('.'))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_mode_matches_domain_and_subdomains() {
        let whitelist = Whitelist::default();
        assert!(whitelist.is_whitelisted("wikipedia.org/wiki/X"));
        assert!(whitelist.is_whitelisted("en.wikipedia.org/wiki/X"));
        assert!(whitelist.is_whitelisted("github.com"));
        assert!(!whitelist.is_whitelisted("evil-wikipedia.org.attacker.com/login"));
        assert!(!whitelist.is_whitelisted("notgithub.com/repo"));
        assert!(!whitelist.is_whitelisted("attacker.com/google.com"));
    }

    #[test]
    fn test_substring_mode_keeps_broad_matching() {
        let whitelist = Whitelist::new(WhitelistMode::Substring, Vec::new());
        assert!(whitelist.is_whitelisted("wikipedia.org/wiki/X"));
        assert!(whitelist.is_whitelisted("evil-wikipedia.org.attacker.com/login"));
        assert!(whitelist.is_whitelisted("attacker.com/google.com"));
        assert!(!whitelist.is_whitelisted("example.com/about"));
    }

    #[test]
    fn test_extra_domains() {
        let whitelist = Whitelist::new(
            WhitelistMode::Domain,
            vec!["mozilla.org".to_string(), "github.com".to_string()],
        );
        assert_eq!(whitelist.domains().len(), 6);
        assert!(whitelist.is_whitelisted("developer.mozilla.org/en-US/"));
    }

    #[test]
    fn test_empty_canonical_url() {
        assert!(!Whitelist::default().is_whitelisted(""));
        assert!(!Whitelist::new(WhitelistMode::Substring, Vec::new()).is_whitelisted(""));
    }
}
