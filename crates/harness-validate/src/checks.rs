//! Well-known format checkers
//!
//! Each checker returns `Err` with the failure text that follows the
//! display path in the violation message (`<path> contains invalid UUID`).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Outcome of a format check
pub type Check = Result<(), &'static str>;

/// Formats a string or bytes field can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// RFC 5322 address, optionally with a display name
    Email,
    /// RFC 1034 host name
    Hostname,
    /// IPv4 or IPv6 address
    Ip,
    /// IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// Absolute URI
    Uri,
    /// Absolute or relative URI reference
    UriRef,
    /// Host name or IP address
    Address,
    /// Hyphenated UUID
    Uuid,
}

impl Format {
    /// Name used in rule documents
    pub fn name(self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::Hostname => "hostname",
            Format::Ip => "ip",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uri => "uri",
            Format::UriRef => "uri_ref",
            Format::Address => "address",
            Format::Uuid => "uuid",
        }
    }

    /// Check a string value
    pub fn check_str(self, value: &str) -> Check {
        match self {
            Format::Email => email(value),
            Format::Hostname => hostname(value),
            Format::Ip => ip(value),
            Format::Ipv4 => ipv4(value),
            Format::Ipv6 => ipv6(value),
            Format::Uri => uri(value),
            Format::UriRef => uri_ref(value),
            Format::Address => address(value),
            Format::Uuid => uuid(value),
        }
    }

    /// Check a bytes value (only the IP formats apply to bytes)
    pub fn check_bytes(self, value: &[u8]) -> Check {
        match (self, value.len()) {
            (Format::Ip, 4 | 16) | (Format::Ipv4, 4) | (Format::Ipv6, 16) => Ok(()),
            (Format::Ip, _) => Err("contains invalid IP address"),
            (Format::Ipv4, _) => Err("contains invalid IPv4 address"),
            (Format::Ipv6, _) => Err("contains invalid IPv6 address"),
            _ => match std::str::from_utf8(value) {
                Ok(text) => self.check_str(text),
                Err(_) => Err("contains invalid UTF-8"),
            },
        }
    }
}

/// `user@example.com` or `Name <user@example.com>`
pub fn email(value: &str) -> Check {
    if value.split(',').filter(|part| !part.trim().is_empty()).count() > 1 {
        return Err("contains more than one email address");
    }

    let value = value.trim();
    let address = match (value.rfind('<'), value.strip_suffix('>')) {
        (Some(start), Some(rest)) => &rest[start + 1..],
        _ => value,
    };

    let (local, domain) = address
        .rsplit_once('@')
        .ok_or("contains invalid email address")?;
    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>()[]\\,;:\"".contains(c));
    if !local_ok || hostname(domain).is_err() {
        return Err("contains invalid email address");
    }
    Ok(())
}

/// Dotted host name; single-label names other than `localhost` are rejected
pub fn hostname(value: &str) -> Check {
    const INVALID: &str = "contains invalid hostname";

    let value = value.strip_suffix('.').unwrap_or(value);
    if value.eq_ignore_ascii_case("localhost") {
        return Ok(());
    }
    if value.is_empty() || value.len() > 253 {
        return Err(INVALID);
    }

    let labels: Vec<&str> = value.split('.').collect();
    if labels.len() < 2 {
        return Err(INVALID);
    }
    for label in &labels {
        let valid = (1..=63).contains(&label.len())
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return Err(INVALID);
        }
    }
    if labels
        .last()
        .is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(INVALID);
    }
    Ok(())
}

/// IPv4 or IPv6 literal
pub fn ip(value: &str) -> Check {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| "contains invalid IP address")
}

/// Dotted-quad IPv4 literal
pub fn ipv4(value: &str) -> Check {
    value
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| "contains invalid IPv4 address")
}

/// IPv6 literal
pub fn ipv6(value: &str) -> Check {
    value
        .parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| "contains invalid IPv6 address")
}

/// Host name or IP literal
pub fn address(value: &str) -> Check {
    if ip(value).is_ok() || hostname(value).is_ok() {
        Ok(())
    } else {
        Err("contains invalid address")
    }
}

fn check_host(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => address(domain).is_ok(),
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) | None => true,
    }
}

/// Absolute URI with a valid host, if any
pub fn uri(value: &str) -> Check {
    match url::Url::parse(value) {
        Ok(url) if check_host(&url) => Ok(()),
        _ => Err("contains invalid URI"),
    }
}

fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~:/?#[]@!$&'()*+,;=%".contains(c)
}

/// Absolute URI or relative reference
pub fn uri_ref(value: &str) -> Check {
    const INVALID: &str = "contains invalid URI-reference";

    match url::Url::parse(value) {
        Ok(url) if check_host(&url) => Ok(()),
        Ok(_) => Err(INVALID),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if !value.chars().all(is_reference_char) {
                return Err(INVALID);
            }
            let bytes = value.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if *b == b'%'
                    && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                        && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
                {
                    return Err(INVALID);
                }
            }
            Ok(())
        }
        Err(_) => Err(INVALID),
    }
}

/// Canonical hyphenated UUID, any case
pub fn uuid(value: &str) -> Check {
    const INVALID: &str = "contains invalid UUID";

    let hyphens_ok = value.len() == 36
        && value
            .char_indices()
            .all(|(i, c)| matches!(i, 8 | 13 | 18 | 23) == (c == '-'));
    if !hyphens_ok {
        return Err(INVALID);
    }
    uuid::Uuid::parse_str(value).map(|_| ()).map_err(|_| INVALID)
}
