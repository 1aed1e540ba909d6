use std::{net::IpAddr, str::FromStr, sync::OnceLock};

use actix_web::HttpRequest;
use log::{debug, trace};
use regex::Regex;

use crate::config::ProxyConfig;

fn forwarded_for_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"for="?(?P<ip>[^;,"]+)"#).expect("Forwarded header regex is valid"))
}

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The first address in the `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the
///    configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| forwarded_for_regex().captures(v))
            .and_then(|caps| caps.name("ip"))
            .map(|m| m.as_str())
            .and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

/// The identity a client is rate limited under. Requests whose origin cannot be determined share one bucket.
pub fn client_identity(req: &HttpRequest, proxy: &ProxyConfig) -> String {
    get_remote_ip(req, proxy.use_x_forwarded_for, proxy.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod test {
    use std::net::SocketAddr;

    use actix_web::test::TestRequest;

    use super::*;

    fn peer() -> SocketAddr {
        "10.1.1.1:4000".parse().unwrap()
    }

    #[test]
    fn peer_address_is_the_default() {
        let req = TestRequest::default()
            .peer_addr(peer())
            .insert_header(("X-Forwarded-For", "192.168.1.1"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, false, false), Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn first_x_forwarded_for_entry_wins() {
        let req = TestRequest::default()
            .peer_addr(peer())
            .insert_header(("X-Forwarded-For", "192.168.1.1, 172.16.0.1"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, false), Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn forwarded_header() {
        let req = TestRequest::default()
            .peer_addr(peer())
            .insert_header(("Forwarded", "for=192.0.2.60;proto=http;by=203.0.113.43"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, false, true), Some("192.0.2.60".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, true, false), Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn unknown_client_identity() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_identity(&req, &ProxyConfig::default()), "unknown");
    }
}
