//! Rewrites share links into directly fetchable media URLs.
//!
//! Only the host is substituted; scheme, userinfo, port, path, query and
//! fragment are carried over byte for byte. Anything that does not parse as
//! `scheme://authority...` (or `//authority...`) passes through untouched.

/// Share-link hosts and the host that serves their raw content.
///
/// No target host appears on the left-hand side, which keeps `normalize`
/// idempotent.
const SHARE_HOSTS: &[(&str, &str)] = &[
    ("www.dropbox.com", "dl.dropboxusercontent.com"),
    ("dropbox.com", "dl.dropboxusercontent.com"),
    ("m.dropbox.com", "dl.dropboxusercontent.com"),
    ("dl.dropbox.com", "dl.dropboxusercontent.com"),
];

/// Normalize a raw media link. Pure and total.
pub fn normalize(raw_url: &str) -> String {
    let Some((start, end)) = host_span(raw_url) else {
        return raw_url.to_string();
    };

    match direct_host(&raw_url[start..end]) {
        Some(direct) => {
            let mut out = String::with_capacity(raw_url.len() + direct.len());
            out.push_str(&raw_url[..start]);
            out.push_str(direct);
            out.push_str(&raw_url[end..]);
            out
        }
        None => raw_url.to_string(),
    }
}

/// Whether the link points at a known share host.
pub fn is_share_link(raw_url: &str) -> bool {
    host_span(raw_url).is_some_and(|(start, end)| direct_host(&raw_url[start..end]).is_some())
}

fn direct_host(host: &str) -> Option<&'static str> {
    SHARE_HOSTS
        .iter()
        .find(|(share, _)| share.eq_ignore_ascii_case(host))
        .map(|(_, direct)| *direct)
}

/// Byte range of the host inside `url`, if it has an authority component.
fn host_span(url: &str) -> Option<(usize, usize)> {
    let authority_start = if let Some(rest) = url.strip_prefix("//") {
        url.len() - rest.len()
    } else {
        let sep = url.find("://")?;
        let scheme = &url[..sep];
        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return None;
        }
        sep + 3
    };

    let authority_len = url[authority_start..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - authority_start);
    let authority = &url[authority_start..authority_start + authority_len];

    let host_offset = authority.rfind('@').map_or(0, |at| at + 1);
    let host_and_port = &authority[host_offset..];
    // Bracketed IPv6 literals never match a share host; leave them whole.
    let host_len = if host_and_port.starts_with('[') {
        host_and_port.len()
    } else {
        host_and_port.find(':').unwrap_or(host_and_port.len())
    };

    if host_len == 0 {
        return None;
    }
    let start = authority_start + host_offset;
    Some((start, start + host_len))
}
