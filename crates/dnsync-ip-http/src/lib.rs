// # HTTP Public IP Source
//
// This crate provides the value source used for address records: it asks an
// IP echo service (ipify by default) which address the host is seen from.
//
// ## Behavior
//
// - One GET request per call; nothing is cached between ticks
// - The response body is trimmed and must parse as an IP address
// - The address family must match the record type (A wants IPv4, AAAA IPv6)
// - A 10 second request timeout keeps a hung service from stalling a tick
//   for longer than necessary
//
// Any failure is returned to the synchronizer, which logs it as a failed
// attempt. The next tick asks again.

use std::net::IpAddr;
use std::time::Duration;

use dnsync_core::config::{RecordType, ValueConfig};
use dnsync_core::registry::PUBLIC_IP_VALUE_SOURCE;
use dnsync_core::traits::{ValueSource, ValueSourceFactory};
use dnsync_core::{Error, ProviderRegistry, Result};

/// Request timeout for the echo service
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL returning the caller's address as plain text
    url: String,

    /// Record type the address is destined for
    record_type: RecordType,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Echo service URL (e.g., "https://api.ipify.org")
    /// - `record_type`: `A` or `AAAA`; decides which address family is accepted
    pub fn new(url: impl Into<String>, record_type: RecordType) -> Result<Self> {
        if !record_type.is_address() {
            return Err(Error::config(format!(
                "Public IP source cannot feed a {} record",
                record_type
            )));
        }

        Ok(Self {
            url: url.into(),
            record_type,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        })
    }

    /// Fetch the response body from the echo service
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::value_source(format!(
                "{} answered with HTTP {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response from {}: {}", self.url, e)))
    }
}

#[async_trait::async_trait]
impl ValueSource for HttpIpSource {
    async fn current(&self) -> Result<String> {
        let body = self.fetch().await?;
        let ip = parse_ip(&body, self.record_type)?;

        tracing::debug!("{} reports {}", self.url, ip);
        Ok(ip.to_string())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Parse an echo service response into an address for `record_type`
pub fn parse_ip(body: &str, record_type: RecordType) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::value_source(format!("Invalid IP address: {:?}", text)))?;

    if !record_type.accepts(&ip) {
        let expected = match record_type {
            RecordType::Aaaa => "IPv6",
            _ => "IPv4",
        };
        return Err(Error::value_source(format!(
            "Expected {} for {} record, got: {}",
            expected, record_type, ip
        )));
    }

    Ok(ip)
}

/// Factory for creating HTTP IP sources
pub struct HttpFactory;

impl ValueSourceFactory for HttpFactory {
    fn create(&self, config: &ValueConfig, record_type: RecordType) -> Result<Box<dyn ValueSource>> {
        match config {
            ValueConfig::PublicIp { url } => {
                Ok(Box::new(HttpIpSource::new(url.clone(), record_type)?))
            }
            _ => Err(Error::config("Invalid config for HTTP IP source")),
        }
    }
}

/// Register the HTTP IP source with a registry
///
/// # Example
///
/// ```rust
/// use dnsync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnsync_ip_http::register(&registry);
/// assert!(registry.has_value_source("public_ip"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_value_source(PUBLIC_IP_VALUE_SOURCE, Box::new(HttpFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `status` and `body` to the next `requests` connections
    async fn serve(status: &'static str, body: &'static str, requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for _ in 0..requests {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        format!("http://{}/", addr)
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(
            parse_ip("203.0.113.7\n", RecordType::A).unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_ip(" 2001:db8::1 ", RecordType::Aaaa).unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_parse_ip_rejects_wrong_family() {
        let err = parse_ip("2001:db8::1", RecordType::A).unwrap_err();
        assert!(err.to_string().contains("Expected IPv4"));

        let err = parse_ip("203.0.113.7", RecordType::Aaaa).unwrap_err();
        assert!(err.to_string().contains("Expected IPv6"));
    }

    #[test]
    fn test_parse_ip_rejects_garbage() {
        assert!(parse_ip("<html>rate limited</html>", RecordType::A).is_err());
        assert!(parse_ip("", RecordType::A).is_err());
    }

    #[test]
    fn test_non_address_record_rejected() {
        assert!(HttpIpSource::new("https://api.ipify.org", RecordType::Txt).is_err());
    }

    #[test]
    fn test_factory() {
        let factory = HttpFactory;
        let config = ValueConfig::PublicIp {
            url: "https://api6.ipify.org".to_string(),
        };

        let source = factory.create(&config, RecordType::Aaaa).unwrap();
        assert_eq!(source.describe(), "https://api6.ipify.org");

        let wrong = ValueConfig::Static {
            content: "x".to_string(),
        };
        assert!(factory.create(&wrong, RecordType::A).is_err());
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_value_source(PUBLIC_IP_VALUE_SOURCE));
    }

    #[tokio::test]
    async fn test_current_queries_each_call() {
        let url = serve("200 OK", "198.51.100.4\n", 2).await;
        let source = HttpIpSource::new(url, RecordType::A).unwrap();

        assert_eq!(source.current().await.unwrap(), "198.51.100.4");
        assert_eq!(source.current().await.unwrap(), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let url = serve("503 Service Unavailable", "busy", 1).await;
        let source = HttpIpSource::new(url, RecordType::A).unwrap();

        let err = source.current().await.unwrap_err();
        assert!(matches!(err, Error::ValueSource(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpIpSource::new(format!("http://{}/", addr), RecordType::A).unwrap();
        let err = source.current().await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
