use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Everything the login path observes about the client, captured once per
/// request and carried through the registry and the alert emails.
#[derive(Debug, Clone)]
pub struct DeviceObservation {
    pub device_name: String,
    pub os: String,
    pub browser: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
    pub is_bot: bool,
}

impl DeviceObservation {
    pub fn from_request(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let ip_address = client_ip(headers, peer);
        let parsed = parse_user_agent(&user_agent);

        Self {
            device_name: parsed.device,
            os: parsed.os,
            browser: parsed.browser,
            user_agent,
            ip_address,
            is_bot: parsed.is_bot,
        }
    }

    pub fn fingerprint(&self) -> String {
        generate_fingerprint(&self.user_agent, self.ip_address.as_deref())
    }
}

/// First entry of X-Forwarded-For wins; the socket peer is the fallback.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

/// SHA-256 over the user-agent, with the IP appended after a `|` separator
/// unless it is loopback. Loopback traffic is deliberately IP-agnostic so
/// that same-machine testing can simulate devices via UA changes alone.
pub fn generate_fingerprint(user_agent: &str, ip: Option<&str>) -> String {
    let mut base = user_agent.to_string();
    if let Some(ip) = ip {
        if !ip.is_empty() && !is_loopback(ip) {
            base.push('|');
            base.push_str(ip);
        }
    }
    let digest = Sha256::digest(base.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_loopback(ip: &str) -> bool {
    ip.parse::<IpAddr>()
        .map(|addr| addr.is_loopback())
        .unwrap_or(false)
}

pub struct ParsedUserAgent {
    pub device: String,
    pub os: String,
    pub browser: String,
    pub is_bot: bool,
}

static OS_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"Windows NT ([\d.]+)").unwrap(), "Windows"),
        (Regex::new(r"Android ([\d.]+)").unwrap(), "Android"),
        (
            Regex::new(r"(?:iPhone|CPU) OS ([\d_]+)").unwrap(),
            "iOS",
        ),
        (Regex::new(r"Mac OS X ([\d_.]+)").unwrap(), "macOS"),
        (Regex::new(r"(Linux)").unwrap(), "Linux"),
    ]
});

static BROWSER_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"Edg/([\d.]+)").unwrap(), "Edge"),
        (Regex::new(r"OPR/([\d.]+)").unwrap(), "Opera"),
        (Regex::new(r"Firefox/([\d.]+)").unwrap(), "Firefox"),
        (Regex::new(r"Chrome/([\d.]+)").unwrap(), "Chrome"),
        (Regex::new(r"Version/([\d.]+).*Safari").unwrap(), "Safari"),
    ]
});

static BOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bot|crawler|spider|curl|wget").unwrap());

pub fn parse_user_agent(ua: &str) -> ParsedUserAgent {
    let os = OS_PATTERNS
        .iter()
        .find_map(|(re, family)| {
            re.captures(ua).map(|c| match c.get(1) {
                Some(v) if *family != "Linux" => {
                    format!("{family} {}", v.as_str().replace('_', "."))
                }
                _ => (*family).to_string(),
            })
        })
        .unwrap_or_else(|| "Unknown OS".to_string());

    let browser = BROWSER_PATTERNS
        .iter()
        .find_map(|(re, family)| {
            re.captures(ua)
                .and_then(|c| c.get(1))
                .map(|v| format!("{family} {}", v.as_str()))
        })
        .unwrap_or_else(|| "Unknown browser".to_string());

    let device = if ua.contains("iPhone") {
        "iPhone"
    } else if ua.contains("iPad") {
        "iPad"
    } else if ua.contains("Android") {
        if ua.contains("Mobile") {
            "Android phone"
        } else {
            "Android tablet"
        }
    } else if ua.contains("Macintosh") {
        "Mac"
    } else if ua.contains("Windows") || ua.contains("X11") || ua.contains("Linux") {
        "Desktop"
    } else {
        "Unknown device"
    };

    ParsedUserAgent {
        device: device.to_string(),
        os,
        browser,
        is_bot: BOT_RE.is_match(ua),
    }
}
