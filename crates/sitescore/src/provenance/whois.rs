//! WHOIS client (RFC 3912) implementing `RegistryLookup`.
//!
//! The TLD's authoritative server is discovered through IANA, then queried for
//! the registered domain. Thin registries point at the registrar's own server
//! via `Registrar WHOIS Server`, which is followed once.

use super::{DomainRecord, RegistryLookup};
use crate::domain::registered_domain;
use crate::error::LookupError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// IANA's root WHOIS server.
pub const IANA_WHOIS: &str = "whois.iana.org";
pub const WHOIS_PORT: u16 = 43;

const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered on",
    "registered",
    "registration time",
    "registration date",
    "domain registration date",
    "domain record activated",
    "record created",
];

const REGISTRAR_KEYS: &[&str] = &["registrar", "sponsoring registrar", "registrar name"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%Y%m%d",
];

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// WHOIS over TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    root_server: String,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    /// Client rooted at IANA, with a per-query timeout.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            root_server: IANA_WHOIS.to_string(),
            port: WHOIS_PORT,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Use a different root server and port for every query.
    pub fn with_root(mut self, server: &str, port: u16) -> Self {
        self.root_server = server.to_string();
        self.port = port;
        self
    }

    /// Send one query and read the reply until the server closes.
    async fn query(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let exchange = async {
            let mut stream = TcpStream::connect((server, self.port)).await?;
            stream.write_all(format!("{query}\r\n").as_bytes()).await?;
            let mut buf = Vec::new();
            (&mut stream)
                .take(MAX_RESPONSE_BYTES)
                .read_to_end(&mut buf)
                .await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Timeout {
                target: format!("{server} ({query})"),
            })??;
        Ok(reply)
    }
}

#[async_trait]
impl RegistryLookup for WhoisClient {
    async fn lookup(&self, fqdn: &str) -> Result<DomainRecord, LookupError> {
        let domain = registered_domain(fqdn);
        let tld = domain
            .rsplit('.')
            .next()
            .filter(|t| !t.is_empty() && *t != domain)
            .ok_or_else(|| LookupError::NoDomain(fqdn.to_string()))?;

        let iana = self.query(&self.root_server, tld).await?;
        let server = parse_referral(&iana)
            .ok_or_else(|| LookupError::Failed(format!("no WHOIS server for .{tld}")))?;
        debug!("WHOIS server for .{tld} is {server}");

        let reply = self.query(&server, &domain).await?;
        let mut record = parse_record(&reply);

        if let Some(registrar_server) = parse_registrar_server(&reply) {
            if !registrar_server.eq_ignore_ascii_case(&server) {
                match self.query(&registrar_server, &domain).await {
                    Ok(detail) => {
                        let detailed = parse_record(&detail);
                        if !detailed.creation_dates.is_empty() {
                            record.creation_dates = detailed.creation_dates;
                        }
                        if detailed.registrar.is_some() {
                            record.registrar = detailed.registrar;
                        }
                    }
                    Err(e) => debug!("registrar WHOIS {registrar_server} failed: {e}"),
                }
            }
        }

        if record.creation_dates.is_empty() && record.registrar.is_none() {
            let lower = reply.to_lowercase();
            if lower.contains("limit exceeded") || lower.contains("rate limit") {
                return Err(LookupError::Failed(format!("{server} rate limited the query")));
            }
            return Err(LookupError::NotFound(domain));
        }
        Ok(record)
    }
}

/// `(key, value)` pairs from a WHOIS reply. Comment lines are skipped and a
/// key with an empty value takes the next non-empty line.
fn fields(reply: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('%') && !l.starts_with('#') && !l.starts_with(">>>"))
        .collect();

    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let mut value = value.trim().to_string();
        if value.is_empty() {
            if let Some(next) = lines[i + 1..].iter().find(|l| !l.is_empty()) {
                if !next.contains(": ") {
                    value = next.to_string();
                }
            }
        }
        if !value.is_empty() {
            out.push((key, value));
        }
    }
    out
}

fn parse_referral(reply: &str) -> Option<String> {
    fields(reply)
        .into_iter()
        .find(|(k, _)| k == "refer" || k == "whois")
        .map(|(_, v)| v)
}

fn parse_registrar_server(reply: &str) -> Option<String> {
    fields(reply)
        .into_iter()
        .find(|(k, _)| k == "registrar whois server")
        .map(|(_, v)| {
            v.trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        })
        .filter(|v| !v.is_empty())
}

/// Creation dates and registrar from a WHOIS reply.
pub fn parse_record(reply: &str) -> DomainRecord {
    let mut record = DomainRecord::default();
    for (key, value) in fields(reply) {
        if CREATION_KEYS.contains(&key.as_str()) {
            if let Some(date) = parse_date(&value) {
                record.creation_dates.push(date);
            }
        } else if record.registrar.is_none() && REGISTRAR_KEYS.contains(&key.as_str()) {
            record.registrar = Some(value);
        }
    }
    record
}

/// Parse the many date spellings registries use. Falls back to January 1st of
/// the first plausible year in the string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    let first = value.split_whitespace().next().unwrap_or(value);
    for candidate in [value, first] {
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                return Some(date);
            }
        }
    }
    if let Some(head) = first.split('T').next() {
        if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
            return Some(date);
        }
    }
    let year: i32 = YEAR_RE.find(value)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    const VERISIGN_REPLY: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
>>> Last update of whois database: 2025-01-01T00:00:00Z <<<
";

    #[test]
    fn test_parse_record_verisign() {
        let record = parse_record(VERISIGN_REPLY);
        assert_eq!(record.creation_dates.len(), 1);
        assert_eq!(record.creation_dates[0].year(), 1995);
        assert_eq!(
            record.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
    }

    #[test]
    fn test_parse_record_nominet_layout() {
        let reply = "\
    Domain name:
        example.co.uk

    Registrar:
        Markmonitor Inc. t/a MarkMonitor Inc. [Tag = MARKMONITOR]

    Relevant dates:
        Registered on: 26-Aug-1996
        Expiry date:  26-Aug-2026
";
        let record = parse_record(reply);
        assert_eq!(record.creation_dates, vec![NaiveDate::from_ymd_opt(1996, 8, 26).unwrap()]);
        assert_eq!(
            record.registrar.as_deref(),
            Some("Markmonitor Inc. t/a MarkMonitor Inc. [Tag = MARKMONITOR]")
        );
    }

    #[test]
    fn test_parse_record_multiple_dates_keep_order() {
        let reply = "created: 2003-02-01\ncreated: 1999-05-05\n";
        let record = parse_record(reply);
        assert_eq!(record.creation_dates[0].year(), 2003);
        assert_eq!(record.creation_dates.len(), 2);
    }

    #[test]
    fn test_parse_date_variants() {
        let d = |s| parse_date(s).map(|d| (d.year(), d.month(), d.day()));
        assert_eq!(d("1997-09-15T04:00:00Z"), Some((1997, 9, 15)));
        assert_eq!(d("1997-09-15T07:00:00.0Z"), Some((1997, 9, 15)));
        assert_eq!(d("2001-03-04 10:11:12"), Some((2001, 3, 4)));
        assert_eq!(d("15-Sep-1997"), Some((1997, 9, 15)));
        assert_eq!(d("2004.05.06"), Some((2004, 5, 6)));
        assert_eq!(d("20100102"), Some((2010, 1, 2)));
        assert_eq!(d("before Aug-1996"), Some((1996, 1, 1)));
        assert_eq!(d("unknown"), None);
    }

    #[test]
    fn test_parse_referral() {
        let iana = "% IANA WHOIS server\n\ndomain:       COM\n\nrefer:        whois.verisign-grs.com\n";
        assert_eq!(parse_referral(iana).as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(parse_referral("% nothing here\n"), None);
    }

    /// Minimal WHOIS server: TLD queries get a referral back to itself.
    async fn spawn_server(record: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut line = String::new();
                    let mut reader = tokio::io::BufReader::new(read);
                    reader.read_line(&mut line).await.unwrap();
                    let reply = if line.trim().contains('.') {
                        record.to_string()
                    } else {
                        "refer: 127.0.0.1\n".to_string()
                    };
                    write.write_all(reply.as_bytes()).await.unwrap();
                    write.shutdown().await.unwrap();
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn test_lookup_against_local_server() {
        let port = spawn_server(
            "Domain Name: EXAMPLE.COM\nCreation Date: 1995-08-14T04:00:00Z\nRegistrar: Test Registrar\n",
        )
        .await;
        let client = WhoisClient::new(2_000).with_root("127.0.0.1", port);

        let record = client.lookup("www.example.com").await.unwrap();
        assert_eq!(record.creation_dates[0].year(), 1995);
        assert_eq!(record.registrar.as_deref(), Some("Test Registrar"));
    }

    #[tokio::test]
    async fn test_lookup_no_match() {
        let port = spawn_server("No match for \"NOPE.COM\".\n").await;
        let client = WhoisClient::new(2_000).with_root("127.0.0.1", port);
        let err = client.lookup("nope.com").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_rejects_bare_host() {
        let client = WhoisClient::new(500);
        let err = client.lookup("localhost").await.unwrap_err();
        assert!(matches!(err, LookupError::NoDomain(_)));
    }
}
