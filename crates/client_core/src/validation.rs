//! Hostname syntax checks used by name editing.

use crate::ValidationService;

const MAX_HOSTNAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Default, Clone, Copy)]
pub struct HostnameValidator;

impl ValidationService for HostnameValidator {
    fn validate_hostname(&self, hostname: &str) -> bool {
        is_valid_hostname(hostname)
    }
}

/// Dot-separated labels of ASCII alphanumerics and inner hyphens, at most
/// 63 bytes per label and 255 overall. A single trailing dot is allowed.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    let name = hostname.strip_suffix('.').unwrap_or(hostname);
    if name.is_empty() {
        return false;
    }

    name.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    bytes.len() <= MAX_LABEL_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}
