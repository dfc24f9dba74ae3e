//! HTTP/1.x and WebSocket wire builders
//!
//! Pure transforms from structured request parameters to transmit-ready
//! byte buffers. No I/O happens here; the façade hands the produced buffers
//! to the transport engine as one logical unit.

use std::borrow::Cow;
use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};
use http::Method;

use crate::config::HttpVersion;

/// Largest possible WebSocket frame header: 2 bytes base, 8 bytes extended
/// length, 4 bytes mask key.
pub const MAX_WS_HEADER_LEN: usize = 14;

/// WebSocket frame opcode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WsOpcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

/// Build a full request: request line, header block, optional entity body.
///
/// `host` carries the remote endpoint for Host-header defaulting; the port
/// is `None` when it equals the protocol default and is then omitted from
/// the header value. Caller-supplied `Host` and `Content-Length` headers
/// always win over the defaulted ones. CONNECT requests pass `host: None`
/// and their target through `path` untouched.
pub fn build_request(
    method: &Method,
    path: &str,
    version: HttpVersion,
    headers: &[(&str, &str)],
    body: &[u8],
    host: Option<(&str, Option<u16>)>,
) -> Bytes {
    let connect = *method == Method::CONNECT;
    let path = normalize_path(connect, path);

    let mut head = String::with_capacity(128 + headers.len() * 32);
    let _ = write!(head, "{} {} {}\r\n", method.as_str(), path, version.as_str());

    let mut has_host = false;
    let mut has_length = false;
    for (name, value) in headers {
        has_host |= name.eq_ignore_ascii_case("host");
        has_length |= name.eq_ignore_ascii_case("content-length")
            || name.eq_ignore_ascii_case("transfer-encoding");
        let _ = write!(head, "{name}: {value}\r\n");
    }

    if !has_host {
        if let Some((name, port)) = host {
            match port {
                Some(port) => {
                    let _ = write!(head, "Host: {name}:{port}\r\n");
                }
                None => {
                    let _ = write!(head, "Host: {name}\r\n");
                }
            }
        }
    }

    if !has_length && body_requires_length(method, body) {
        let _ = write!(head, "Content-Length: {}\r\n", body.len());
    }

    head.push_str("\r\n");

    let mut buf = BytesMut::with_capacity(head.len() + body.len());
    buf.put_slice(head.as_bytes());
    buf.put_slice(body);
    buf.freeze()
}

/// Encode one chunked-transfer segment.
///
/// Empty `data` produces the terminal `0\r\n\r\n` chunk that ends the
/// chunked body.
pub fn build_chunk(data: &[u8], extensions: Option<&str>) -> Bytes {
    let mut head = format!("{:X}", data.len());
    if let Some(ext) = extensions.filter(|e| !e.is_empty()) {
        head.push(';');
        head.push_str(ext);
    }
    head.push_str("\r\n");

    let mut buf = BytesMut::with_capacity(head.len() + data.len() + 2);
    buf.put_slice(head.as_bytes());
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Encode one WebSocket frame.
///
/// When a mask key is supplied the payload is XOR-masked into a private
/// copy; the caller's slice is never mutated. `declared_len` lets a caller
/// announce a message length larger than this fragment; it defaults to the
/// fragment length.
pub fn build_ws_frame(
    fin: bool,
    reserved: u8,
    opcode: WsOpcode,
    mask: Option<[u8; 4]>,
    data: &[u8],
    declared_len: Option<u64>,
) -> Bytes {
    let len = declared_len.unwrap_or(data.len() as u64);
    let mut buf = BytesMut::with_capacity(MAX_WS_HEADER_LEN + data.len());

    buf.put_u8((u8::from(fin) << 7) | ((reserved & 0x07) << 4) | opcode as u8);

    let mask_bit = if mask.is_some() { 0x80u8 } else { 0 };
    if len < 126 {
        buf.put_u8(mask_bit | len as u8);
    } else if len <= u64::from(u16::MAX) {
        buf.put_u8(mask_bit | 126);
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(mask_bit | 127);
        buf.put_u64(len);
    }

    match mask {
        Some(key) => {
            buf.put_slice(&key);
            let mut masked = data.to_vec();
            for (i, byte) in masked.iter_mut().enumerate() {
                *byte ^= key[i % 4];
            }
            buf.put_slice(&masked);
        }
        None => buf.put_slice(data),
    }

    buf.freeze()
}

/// CONNECT targets pass through verbatim; everything else gets an
/// origin-form path with a leading slash.
fn normalize_path(connect: bool, path: &str) -> Cow<'_, str> {
    if connect {
        return Cow::Borrowed(path);
    }
    if path.is_empty() {
        Cow::Borrowed("/")
    } else if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

fn body_requires_length(method: &Method, body: &[u8]) -> bool {
    if !body.is_empty() {
        return true;
    }
    // Methods that conventionally carry an entity advertise zero explicitly.
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_text(bytes: &Bytes) -> &str {
        std::str::from_utf8(bytes).expect("packet should be utf-8 in tests")
    }

    #[test]
    fn request_line_and_default_host() {
        let packet = build_request(
            &Method::GET,
            "/index.html",
            HttpVersion::Http11,
            &[("Accept", "*/*")],
            &[],
            Some(("example.com", None)),
        );
        let text = as_text(&packet);
        assert!(text.starts_with("GET /index.html HTTP/1.1\r\n"));
        assert!(text.contains("Accept: */*\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn non_default_port_appears_in_host_header() {
        let packet = build_request(
            &Method::GET,
            "/",
            HttpVersion::Http11,
            &[],
            &[],
            Some(("example.com", Some(8080))),
        );
        assert!(as_text(&packet).contains("Host: example.com:8080\r\n"));
    }

    #[test]
    fn caller_host_header_wins() {
        let packet = build_request(
            &Method::GET,
            "/",
            HttpVersion::Http11,
            &[("Host", "override.test")],
            &[],
            Some(("example.com", None)),
        );
        let text = as_text(&packet);
        assert!(text.contains("Host: override.test\r\n"));
        assert!(!text.contains("example.com"));
    }

    #[test]
    fn connect_method_skips_host_defaulting_and_path_rewrite() {
        let packet = build_request(
            &Method::CONNECT,
            "proxy.test:443",
            HttpVersion::Http11,
            &[],
            &[],
            None,
        );
        let text = as_text(&packet);
        assert!(text.starts_with("CONNECT proxy.test:443 HTTP/1.1\r\n"));
        assert!(!text.contains("Host:"));
    }

    #[test]
    fn empty_path_becomes_root() {
        let packet = build_request(&Method::GET, "", HttpVersion::Http10, &[], &[], None);
        assert!(as_text(&packet).starts_with("GET / HTTP/1.0\r\n"));
    }

    #[test]
    fn body_gets_content_length_and_is_appended() {
        let packet = build_request(
            &Method::POST,
            "/submit",
            HttpVersion::Http11,
            &[],
            b"name=value",
            None,
        );
        let text = as_text(&packet);
        assert!(text.contains("Content-Length: 10\r\n"));
        assert!(text.ends_with("\r\n\r\nname=value"));
    }

    #[test]
    fn empty_post_body_advertises_zero_length() {
        let packet = build_request(&Method::POST, "/submit", HttpVersion::Http11, &[], &[], None);
        assert!(as_text(&packet).contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn chunk_framing() {
        let chunk = build_chunk(b"hello", None);
        assert_eq!(&chunk[..], b"5\r\nhello\r\n");

        let with_ext = build_chunk(b"hello", Some("trace=1"));
        assert_eq!(&with_ext[..], b"5;trace=1\r\nhello\r\n");
    }

    #[test]
    fn empty_chunk_is_terminal() {
        let chunk = build_chunk(&[], None);
        assert_eq!(&chunk[..], b"0\r\n\r\n");
    }

    #[test]
    fn ws_frame_masks_a_private_copy() {
        let payload = b"abcd".to_vec();
        let key = [0x11, 0x22, 0x33, 0x44];
        let frame = build_ws_frame(true, 0, WsOpcode::Text, Some(key), &payload, None);

        assert_eq!(frame[0], 0x81); // FIN + text opcode
        assert_eq!(frame[1], 0x80 | 4); // masked, length 4
        assert_eq!(&frame[2..6], &key);
        let expected: Vec<u8> = payload
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i % 4])
            .collect();
        assert_eq!(&frame[6..], &expected[..]);
        // Caller memory untouched.
        assert_eq!(payload, b"abcd");
    }

    #[test]
    fn ws_frame_extended_lengths() {
        let medium = vec![0u8; 300];
        let frame = build_ws_frame(true, 0, WsOpcode::Binary, None, &medium, None);
        assert_eq!(frame[1], 126);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 300);
        assert_eq!(frame.len(), 4 + 300);

        let frame = build_ws_frame(false, 0, WsOpcode::Binary, None, &[], Some(70_000));
        assert_eq!(frame[0], 0x02); // no FIN
        assert_eq!(frame[1], 127);
        assert_eq!(
            u64::from_be_bytes(frame[2..10].try_into().expect("8 length bytes")),
            70_000
        );
    }

    #[test]
    fn ws_frame_reserved_bits_land_in_header() {
        let frame = build_ws_frame(true, 0b101, WsOpcode::Pong, None, &[], None);
        assert_eq!(frame[0], 0x80 | (0b101 << 4) | 0x0A);
    }
}
