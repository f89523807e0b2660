//! End-to-end protocol exchanges over real loopback connections.

mod helpers;

use std::sync::Arc;

use clipshare_lib::{Clipboard, MemoryClipboard};
use helpers::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn obsolete_version_gets_status_2_then_fin() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    stream.write_u8(0x00).await.expect("send version");
    assert_eq!(stream.read_u8().await.expect("status"), 0x02);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn unknown_version_negotiates_down_to_max() {
    let dir = tempfile::tempdir().expect("tempdir");
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.set_text("negotiated".into()).expect("preload");
    let server = start_server(test_config(dir.path()), clipboard);

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    stream.write_u8(0xFF).await.expect("send version");
    assert_eq!(stream.read_u8().await.expect("status"), 0x03);
    assert_eq!(stream.read_u8().await.expect("server max"), 0x03);
    stream.write_u8(0x03).await.expect("confirm");

    // the session continues at v3
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    let len = read_i64(&mut stream).await;
    assert_eq!(read_bytes(&mut stream, len as usize).await, b"negotiated");
}

#[tokio::test]
async fn declined_downgrade_closes_the_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    stream.write_u8(0xFF).await.expect("send version");
    assert_eq!(stream.read_u8().await.expect("status"), 0x03);
    assert_eq!(stream.read_u8().await.expect("server max"), 0x03);
    stream.write_u8(0x02).await.expect("decline");
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn negotiation_is_idempotent_across_clients() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    for _ in 0..3 {
        let mut stream = TcpStream::connect(server.plain).await.expect("connect");
        assert_eq!(negotiate(&mut stream, 2).await, 0x01);
    }
    for _ in 0..3 {
        let mut stream = TcpStream::connect(server.plain).await.expect("connect");
        assert_eq!(negotiate(&mut stream, 0).await, 0x02);
    }
}

#[tokio::test]
async fn info_returns_the_build_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x7D).await.expect("info");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    assert_eq!(read_i64(&mut stream).await, 9);
    assert_eq!(read_bytes(&mut stream, 9).await, b"clipshare");
}

#[tokio::test]
async fn get_text_on_an_empty_clipboard_replies_no_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 1).await, 0x01);
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_NO_DATA);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn unknown_method_replies_status_3() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(42).await.expect("bogus method");
    assert_eq!(stream.read_u8().await.expect("status"), 0x03);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn disabled_method_replies_status_4() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.methods.get_text = false;
    let server = start_server(config, Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 1).await, 0x01);
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), 0x04);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn v3_only_methods_are_unknown_to_v1() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 1).await, 0x01);
    stream.write_u8(0x07).await.expect("get-screenshot");
    assert_eq!(stream.read_u8().await.expect("status"), 0x03);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn send_text_round_trips_through_get_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let payload = b"shared across hosts\n";
    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x02).await.expect("send-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    write_i64(&mut stream, payload.len() as i64).await;
    stream.write_all(payload).await.expect("payload");
    expect_eof(&mut stream).await;

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    let len = read_i64(&mut stream).await;
    assert_eq!(read_bytes(&mut stream, len as usize).await, payload);
}

#[tokio::test]
async fn send_text_rejects_zero_length() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x02).await.expect("send-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    write_i64(&mut stream, 0).await;
    expect_eof(&mut stream).await;
    assert_eq!(server.clipboard.get_text().expect("clipboard"), None);
}

#[tokio::test]
async fn send_text_length_boundary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.max_text_length = 8;
    let server = start_server(config, Arc::new(MemoryClipboard::new()));

    // exactly max_text_length is accepted
    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x02).await.expect("send-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    write_i64(&mut stream, 8).await;
    stream.write_all(b"12345678").await.expect("payload");
    expect_eof(&mut stream).await;
    settle().await;
    assert_eq!(server.clipboard.get_text().expect("clipboard").as_deref(), Some("12345678"));

    // one more byte is rejected
    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x02).await.expect("send-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    write_i64(&mut stream, 9).await;
    expect_eof(&mut stream).await;
    assert_eq!(server.clipboard.get_text().expect("clipboard").as_deref(), Some("12345678"));
}

#[tokio::test]
async fn send_text_rejects_control_bytes_and_bad_utf8() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(test_config(dir.path()), Arc::new(MemoryClipboard::new()));

    for payload in [&b"ab\x01cd"[..], &[0x61, 0xFF, 0xFE, 0x62][..]] {
        let mut stream = TcpStream::connect(server.plain).await.expect("connect");
        assert_eq!(negotiate(&mut stream, 3).await, 0x01);
        stream.write_u8(0x02).await.expect("send-text");
        assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
        write_i64(&mut stream, payload.len() as i64).await;
        stream.write_all(payload).await.expect("payload");
        expect_eof(&mut stream).await;
        assert_eq!(server.clipboard.get_text().expect("clipboard"), None);
    }

    // tab, CR and LF are the permitted controls
    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 3).await, 0x01);
    stream.write_u8(0x02).await.expect("send-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    write_i64(&mut stream, 5).await;
    stream.write_all(b"a\tb\nc").await.expect("payload");
    expect_eof(&mut stream).await;
    settle().await;
    assert_eq!(server.clipboard.get_text().expect("clipboard").as_deref(), Some("a\tb\nc"));
}

#[tokio::test]
async fn get_text_too_large_for_the_limit_replies_no_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.max_text_length = 4;
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.set_text("way too long".into()).expect("preload");
    let server = start_server(config, clipboard);

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 1).await, 0x01);
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_NO_DATA);
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn crlf_text_is_normalised_to_lf_on_the_wire() {
    let dir = tempfile::tempdir().expect("tempdir");
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.set_text("one\r\ntwo\r\n".into()).expect("preload");
    let server = start_server(test_config(dir.path()), clipboard);

    let mut stream = TcpStream::connect(server.plain).await.expect("connect");
    assert_eq!(negotiate(&mut stream, 2).await, 0x01);
    stream.write_u8(0x01).await.expect("get-text");
    assert_eq!(stream.read_u8().await.expect("status"), STATUS_OK);
    let len = read_i64(&mut stream).await;
    assert_eq!(read_bytes(&mut stream, len as usize).await, b"one\ntwo\n");
}
