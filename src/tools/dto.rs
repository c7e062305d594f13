use std::net::IpAddr;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    pub text: String,
}

/// Body of `POST /tools/extract-recipe`. When `html` is present the page is
/// not fetched; `url` is then only recorded as the source.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// Where the page markup comes from.
#[derive(Debug, PartialEq)]
pub enum PageInput {
    Html { url: Option<String>, html: String },
    Fetch(reqwest::Url),
}

impl ExtractRequest {
    pub fn validate(self) -> AppResult<PageInput> {
        let url = self.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        let parsed = match url.as_deref() {
            Some(raw) => match reqwest::Url::parse(raw) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Some(u),
                _ => return Err(AppError::validation("url must be an http(s) URL")),
            },
            None => None,
        };
        match (self.html.filter(|h| !h.trim().is_empty()), parsed) {
            (Some(html), _) => Ok(PageInput::Html { url, html }),
            (None, Some(u)) => {
                check_public_url(&u)?;
                Ok(PageInput::Fetch(u))
            }
            (None, None) => Err(AppError::validation("url or html is required")),
        }
    }
}

/// Addresses a fetched page may live at: no loopback, private, link-local,
/// shared, multicast or unspecified ranges.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast()
                || v4.is_documentation()
                || a == 0
                || (a == 100 && (64..128).contains(&b)))
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || first & 0xfe00 == 0xfc00
                || first & 0xffc0 == 0xfe80)
        }
    }
}

/// Rejects URLs whose host is literally local. Names are checked again
/// after resolution when the page is fetched.
pub fn check_public_url(url: &reqwest::Url) -> AppResult<()> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::validation("url has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();
    let local = match host.parse::<IpAddr>() {
        Ok(ip) => !is_public_ip(ip),
        Err(_) => host == "localhost" || host.ends_with(".localhost"),
    };
    if local {
        return Err(AppError::validation("url must point to a public host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_wins_over_fetching() {
        let req = ExtractRequest {
            url: Some(" https://example.com/pie ".into()),
            html: Some("<html></html>".into()),
        };
        assert_eq!(
            req.validate().unwrap(),
            PageInput::Html {
                url: Some("https://example.com/pie".into()),
                html: "<html></html>".into()
            }
        );
    }

    #[test]
    fn url_alone_is_fetched() {
        let req = ExtractRequest { url: Some("https://example.com/pie".into()), html: None };
        assert!(matches!(req.validate().unwrap(), PageInput::Fetch(_)));
    }

    #[test]
    fn rejects_missing_and_non_http_input() {
        assert!(ExtractRequest::default().validate().is_err());
        let req = ExtractRequest { url: Some("file:///etc/passwd".into()), html: None };
        assert!(req.validate().is_err());
    }

    #[test]
    fn local_hosts_are_not_fetched() {
        for url in [
            "http://127.0.0.1:8080/api/health",
            "http://localhost:5432",
            "http://169.254.169.254/latest/meta-data",
            "http://10.0.0.7/recipe",
            "http://[::1]/",
            "http://[::ffff:192.168.1.1]/",
            "http://0.0.0.0/",
        ] {
            let req = ExtractRequest { url: Some(url.into()), html: None };
            assert!(
                matches!(req.validate(), Err(AppError::Validation(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn local_url_is_allowed_as_a_source_label_when_html_is_given() {
        let req = ExtractRequest {
            url: Some("http://localhost/draft".into()),
            html: Some("<html></html>".into()),
        };
        assert!(matches!(req.validate().unwrap(), PageInput::Html { .. }));
    }

    #[test]
    fn public_addresses_pass() {
        assert!(is_public_ip("93.184.216.34".parse().unwrap()));
        assert!(is_public_ip("2606:2800:220:1::248".parse().unwrap()));
        assert!(!is_public_ip("100.64.0.1".parse().unwrap()));
        assert!(!is_public_ip("fd00::1".parse().unwrap()));
    }
}
