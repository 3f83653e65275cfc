use shrike::compress;
use shrike::http::{read_request, Headers, Method, Request, Response, Version};
use tokio::io::BufReader;

async fn parse_bytes(raw: &[u8]) -> std::io::Result<Option<Request>> {
    let mut reader = BufReader::new(raw);
    read_request(&mut reader).await
}

fn plain_request(target: &str) -> Request {
    Request {
        method: Method::Get,
        target: target.to_string(),
        version: Version::Http11,
        headers: Headers::new(),
        body: Vec::new(),
    }
}

#[cfg(test)]
mod request_parsing_tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_crlf_request() {
        let request = parse_bytes(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.target, "/index.html");
        assert_eq!(request.version, Version::Http11);
        assert_eq!(request.headers.get("Host"), Some("localhost"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_parse_lf_only_request() {
        let request = parse_bytes(b"GET / HTTP/1.0\nHost: h\n\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.version, Version::Http10);
        assert_eq!(request.headers.get("host"), Some("h"));
    }

    #[tokio::test]
    async fn test_parse_body_with_content_length() {
        let request = parse_bytes(b"POST /c/Shoes HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, b"hello");
    }

    #[tokio::test]
    async fn test_clean_eof_returns_none() {
        assert!(parse_bytes(b"").await.unwrap().is_none());
        assert!(parse_bytes(b"\r\n\r\n").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_request_line_is_invalid() {
        let err = parse_bytes(b"GARBAGE\r\n\r\n").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_unknown_version_is_invalid() {
        assert!(parse_bytes(b"GET / HTTP/2.0\r\n\r\n").await.is_err());
        assert!(parse_bytes(b"GET / FTP/1.1\r\n\r\n").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_method_is_invalid() {
        assert!(parse_bytes(b"BREW / HTTP/1.1\r\n\r\n").await.is_err());
    }

    #[tokio::test]
    async fn test_header_without_colon_is_invalid() {
        assert!(parse_bytes(b"GET / HTTP/1.1\r\nBadHeader\r\n\r\n").await.is_err());
    }

    #[tokio::test]
    async fn test_eof_inside_headers_is_invalid() {
        assert!(parse_bytes(b"GET / HTTP/1.1\r\nHost: h\r\n").await.is_err());
    }

    #[tokio::test]
    async fn test_bad_content_length_is_invalid() {
        assert!(parse_bytes(b"GET / HTTP/1.1\r\nContent-Length: many\r\n\r\n")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_oversized_headers_are_invalid() {
        let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..600 {
            raw.extend_from_slice(format!("X-Filler-{}: {}\r\n", i, "v".repeat(20)).as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(parse_bytes(&raw).await.is_err());
    }

    #[tokio::test]
    async fn test_multi_value_headers_preserved_in_order() {
        let request = parse_bytes(b"GET / HTTP/1.1\r\nAccept: a\r\nAccept: b\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        let values: Vec<&str> = request.headers.get_all("accept").collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}

#[cfg(test)]
mod keep_alive_tests {
    use super::*;

    fn request_with(version: Version, connection: Option<&str>) -> Request {
        let mut request = plain_request("/");
        request.version = version;
        if let Some(value) = connection {
            request.headers.set("Connection", value);
        }
        request
    }

    #[test]
    fn test_http11_defaults_to_keep_alive() {
        assert!(request_with(Version::Http11, None).keep_alive());
    }

    #[test]
    fn test_http10_defaults_to_close() {
        assert!(!request_with(Version::Http10, None).keep_alive());
    }

    #[test]
    fn test_connection_header_overrides_both_ways() {
        assert!(!request_with(Version::Http11, Some("close")).keep_alive());
        assert!(!request_with(Version::Http11, Some("Close")).keep_alive());
        assert!(request_with(Version::Http10, Some("keep-alive")).keep_alive());
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn test_status_line_and_content_length() {
        let response = Response::text(200, "hello");
        let wire = String::from_utf8(response.serialize(Version::Http11)).unwrap();
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("Content-Type: text/plain\r\n"));
        assert!(wire.contains("Content-Length: 5\r\n"));
        assert!(wire.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_content_length_tracks_body_not_handler_claims() {
        let mut response = Response::text(200, "hello");
        response.headers.set("Content-Length", "9999");
        let wire = String::from_utf8(response.serialize(Version::Http11)).unwrap();
        assert!(wire.contains("Content-Length: 5\r\n"));
        assert!(!wire.contains("9999"));
    }

    #[test]
    fn test_version_matches_request() {
        let response = Response::new(204);
        let wire = String::from_utf8(response.serialize(Version::Http10)).unwrap();
        assert!(wire.starts_with("HTTP/1.0 204 No Content\r\n"));
    }

    #[test]
    fn test_echo_serialization_round_trip() {
        let mut request = plain_request("/echo/x?q=1");
        request.headers.append("Host", "h");
        request.body = b"payload".to_vec();
        let wire = String::from_utf8(request.serialize()).unwrap();
        assert!(wire.starts_with("GET /echo/x?q=1 HTTP/1.1\r\n"));
        assert!(wire.contains("Host: h\r\n"));
        assert!(wire.ends_with("\r\npayload"));
    }
}

#[cfg(test)]
mod compression_tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gzip_request() -> Request {
        let mut request = plain_request("/big");
        request.headers.set("Accept-Encoding", "gzip, deflate");
        request
    }

    fn big_response() -> Response {
        Response::text(200, "x".repeat(4096))
    }

    #[test]
    fn test_large_body_is_compressed() {
        let mut response = big_response();
        compress::apply(&gzip_request(), &mut response);
        assert_eq!(response.headers.get("Content-Encoding"), Some("gzip"));
        assert!(response.body.len() < 4096);

        let mut decoder = GzDecoder::new(&response.body[..]);
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "x".repeat(4096));
    }

    #[test]
    fn test_small_body_is_left_alone() {
        let mut response = Response::text(200, "x".repeat(compress::MIN_COMPRESS_BYTES));
        compress::apply(&gzip_request(), &mut response);
        assert!(response.headers.get("Content-Encoding").is_none());
    }

    #[test]
    fn test_client_without_gzip_is_left_alone() {
        let mut response = big_response();
        compress::apply(&plain_request("/big"), &mut response);
        assert!(response.headers.get("Content-Encoding").is_none());

        let mut request = plain_request("/big");
        request.headers.set("Accept-Encoding", "br");
        let mut response = big_response();
        compress::apply(&request, &mut response);
        assert!(response.headers.get("Content-Encoding").is_none());
    }

    #[test]
    fn test_quality_value_still_counts_as_gzip() {
        let mut request = plain_request("/big");
        request.headers.set("Accept-Encoding", "gzip;q=0.8");
        let mut response = big_response();
        compress::apply(&request, &mut response);
        assert_eq!(response.headers.get("Content-Encoding"), Some("gzip"));
    }

    #[test]
    fn test_existing_encoding_is_preserved() {
        let mut response = big_response();
        response.headers.set("Content-Encoding", "identity");
        compress::apply(&gzip_request(), &mut response);
        assert_eq!(response.headers.get("Content-Encoding"), Some("identity"));
    }

    #[test]
    fn test_content_length_matches_compressed_body() {
        let mut response = big_response();
        compress::apply(&gzip_request(), &mut response);
        let wire = response.serialize(Version::Http11);
        let text = String::from_utf8_lossy(&wire);
        let expected = format!("Content-Length: {}\r\n", response.body.len());
        assert!(text.contains(&expected));
    }
}
