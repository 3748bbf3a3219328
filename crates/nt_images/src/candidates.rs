use nt_core::Result;
use std::fmt;
use url::Url;

pub const PROXY_PATH: &str = "/api/images/proxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// The reference as given, with `//host/...` expanded to https
    Direct,
    /// Same URL with http and https swapped
    ProtocolSwapped,
    /// Fetched and relayed by the backend
    Proxy,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            CandidateKind::Direct => "direct",
            CandidateKind::ProtocolSwapped => "swapped",
            CandidateKind::Proxy => "proxy",
        };
        f.pad(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub url: String,
}

impl Candidate {
    fn new(kind: CandidateKind, url: String) -> Self {
        Self { kind, url }
    }
}

/// Trims the reference and expands protocol-relative URLs. `None` when there
/// is nothing to load.
pub fn normalize_reference(reference: Option<&str>) -> Option<String> {
    let trimmed = reference?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("//") {
        return Some(format!("https:{}", trimmed));
    }
    Some(trimmed.to_string())
}

/// `http://x` becomes `https://x` and the other way round. Anything that does
/// not parse as an http(s) URL has no swapped form.
pub fn swap_protocol(remote: &str) -> Option<String> {
    let parsed = Url::parse(remote).ok()?;
    let scheme = parsed.scheme();
    let prefix = remote.get(..scheme.len())?;
    if !prefix.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let rest = &remote[scheme.len()..];
    match scheme {
        "http" => Some(format!("https{}", rest)),
        "https" => Some(format!("http{}", rest)),
        _ => None,
    }
}

/// `{base}/api/images/proxy?url={remote}` with the remote URL query-encoded.
pub fn proxy_url(proxy_base: &str, remote: &str) -> Result<String> {
    let mut url = Url::parse(&format!("{}{}", proxy_base.trim_end_matches('/'), PROXY_PATH))?;
    url.query_pairs_mut().append_pair("url", remote);
    Ok(url.to_string())
}

/// Builds the ordered candidate list for one reference: direct, swapped
/// protocol when applicable, then the backend proxy. Empty when the reference
/// is empty.
pub fn build_candidates(reference: Option<&str>, proxy_base: &str) -> Vec<Candidate> {
    let Some(remote) = normalize_reference(reference) else {
        return Vec::new();
    };

    let mut candidates = vec![Candidate::new(CandidateKind::Direct, remote.clone())];
    if let Some(swapped) = swap_protocol(&remote) {
        candidates.push(Candidate::new(CandidateKind::ProtocolSwapped, swapped));
    }

    match proxy_url(proxy_base, &remote) {
        Ok(proxied) => candidates.push(Candidate::new(CandidateKind::Proxy, proxied)),
        Err(e) => tracing::warn!(proxy_base, error = %e, "cannot build image proxy url"),
    }
    candidates
}
