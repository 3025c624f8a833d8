use anyhow::Result;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

use skiff::client::{self, GetOutcome, PutOutcome};
use skiff::frame::{self, Request, Response};
use skiff::logger::NoopLogger;
use skiff::server::{serve, ServerConfig};

/// Starts a server over `root` on an ephemeral loopback port and waits for
/// it to accept. The server thread runs for the rest of the test process.
fn start_server(root: &Path) -> Result<String> {
    let port = {
        let sock = TcpListener::bind("127.0.0.1:0")?;
        let p = sock.local_addr()?.port();
        drop(sock);
        p
    };
    let bind = format!("127.0.0.1:{port}");
    let config = ServerConfig {
        bind_addr: bind.clone(),
        root: root.to_path_buf(),
    };
    thread::spawn(move || {
        let _ = serve(&config, &NoopLogger);
    });
    for _ in 0..50u32 {
        if TcpStream::connect(&bind).is_ok() {
            return Ok(bind);
        }
        thread::sleep(Duration::from_millis(20));
    }
    anyhow::bail!("server did not start on {bind}");
}

#[test]
fn list_returns_regular_files_only() -> Result<()> {
    let root = tempfile::tempdir()?;
    std::fs::write(root.path().join("a.txt"), b"aaa")?;
    std::fs::write(root.path().join("b.bin"), b"bbb")?;
    std::fs::create_dir(root.path().join("sub"))?;
    let addr = start_server(root.path())?;

    let names: HashSet<String> = client::list(&addr)?.into_iter().collect();
    let expected: HashSet<String> = ["a.txt", "b.bin"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);
    Ok(())
}

#[test]
fn list_of_empty_directory_is_empty() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;
    assert!(client::list(&addr)?.is_empty());
    Ok(())
}

#[test]
fn get_missing_file_reports_not_found() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;
    let dest = tempfile::tempdir()?;

    match client::get(&addr, "missing.txt", dest.path())? {
        GetOutcome::ServerError(msg) => {
            assert_eq!(msg, "File not found \"missing.txt\"");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn get_streams_exact_bytes() -> Result<()> {
    let root = tempfile::tempdir()?;
    let contents: Vec<u8> = (0u8..10).collect();
    std::fs::write(root.path().join("hello.bin"), &contents)?;
    let addr = start_server(root.path())?;
    let dest = tempfile::tempdir()?;

    match client::get(&addr, "hello.bin", dest.path())? {
        GetOutcome::Saved { path, bytes } => {
            assert_eq!(bytes, 10);
            assert_eq!(path.file_name().unwrap(), "hello.bin");
            assert_eq!(std::fs::read(path)?, contents);
        }
        other => panic!("expected saved file, got {other:?}"),
    }
    Ok(())
}

#[test]
fn get_with_traversal_name_stays_inside_root() -> Result<()> {
    let outer = tempfile::tempdir()?;
    std::fs::write(outer.path().join("secret.txt"), b"top secret")?;
    let root = outer.path().join("served");
    std::fs::create_dir(&root)?;
    let addr = start_server(&root)?;
    let dest = tempfile::tempdir()?;

    // "../secret.txt" sanitizes to "secret.txt", which the served root
    // does not contain; the file one level up must stay unreachable.
    match client::get(&addr, "../secret.txt", dest.path())? {
        GetOutcome::ServerError(msg) => {
            assert_eq!(msg, "File not found \"secret.txt\"");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn put_conflict_leaves_existing_file_untouched() -> Result<()> {
    let root = tempfile::tempdir()?;
    std::fs::write(root.path().join("existing.txt"), b"original contents")?;
    let addr = start_server(root.path())?;

    let local = tempfile::tempdir()?;
    let local_file = local.path().join("existing.txt");
    std::fs::write(&local_file, b"overwrite attempt")?;

    match client::put(&addr, &local_file, "existing.txt")? {
        PutOutcome::ServerError(msg) => {
            assert_eq!(msg, "File Exists: \"existing.txt\"");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert_eq!(
        std::fs::read(root.path().join("existing.txt"))?,
        b"original contents"
    );
    Ok(())
}

#[test]
fn put_then_get_round_trip() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;

    let local = tempfile::tempdir()?;
    let local_file = local.path().join("new.bin");
    std::fs::write(&local_file, [7u8, 8, 9, 10, 11])?;

    match client::put(&addr, &local_file, "new.bin")? {
        PutOutcome::Sent { bytes } => assert_eq!(bytes, 5),
        other => panic!("expected sent, got {other:?}"),
    }

    let dest = tempfile::tempdir()?;
    match client::get(&addr, "new.bin", dest.path())? {
        GetOutcome::Saved { path, bytes } => {
            assert_eq!(bytes, 5);
            assert_eq!(std::fs::read(path)?, [7u8, 8, 9, 10, 11]);
        }
        other => panic!("expected saved file, got {other:?}"),
    }
    Ok(())
}

#[test]
fn put_zero_length_creates_nothing() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;

    let local = tempfile::tempdir()?;
    let local_file = local.path().join("empty.bin");
    std::fs::write(&local_file, b"")?;

    match client::put(&addr, &local_file, "empty.bin")? {
        PutOutcome::Sent { bytes } => assert_eq!(bytes, 0),
        other => panic!("expected sent, got {other:?}"),
    }
    assert!(!root.path().join("empty.bin").exists());
    Ok(())
}

#[test]
fn put_short_transfer_leaves_partial_file() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;

    // Raw socket: declare 100 bytes, deliver 10, then disconnect.
    {
        let mut stream = TcpStream::connect(&addr)?;
        stream.write_all(&frame::encode_request(&Request::Put {
            filename: "partial.bin".to_string(),
            content_length: 100,
        })?)?;
        match frame::decode_response(&mut stream)? {
            Response::Ok { content_length, .. } => assert_eq!(content_length, 0),
            other => panic!("expected ok ack, got {other:?}"),
        }
        stream.write_all(&[0xABu8; 10])?;
    }

    // The server notices the close and keeps what arrived.
    let partial = root.path().join("partial.bin");
    for _ in 0..50u32 {
        if partial.exists() && std::fs::metadata(&partial)?.len() == 10 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(std::fs::read(&partial)?, vec![0xABu8; 10]);
    Ok(())
}

#[test]
fn malformed_frame_gets_generic_error() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;

    let mut stream = TcpStream::connect(&addr)?;
    let body = b"this is not a json header";
    stream.write_all(&(body.len() as u16).to_be_bytes())?;
    stream.write_all(body)?;

    match frame::decode_response(&mut stream)? {
        Response::Error { content_length } => {
            let msg = frame::read_exact(&mut stream, content_length as usize)?;
            assert_eq!(msg, b"send request with a header, see documentation.");
        }
        other => panic!("expected error response, got {other:?}"),
    }
    // One request per connection: the server closes after responding.
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest)?;
    assert!(rest.is_empty());
    Ok(())
}

#[test]
fn unknown_method_closes_without_response() -> Result<()> {
    let root = tempfile::tempdir()?;
    let addr = start_server(root.path())?;

    let mut stream = TcpStream::connect(&addr)?;
    let body = br#"{"method":"DELETE","encoding":"utf-8","content-length":0}"#;
    stream.write_all(&(body.len() as u16).to_be_bytes())?;
    stream.write_all(&body[..])?;

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest)?;
    assert!(rest.is_empty());
    Ok(())
}

#[test]
fn server_survives_repeated_bad_connections() -> Result<()> {
    let root = tempfile::tempdir()?;
    std::fs::write(root.path().join("still-here.txt"), b"ok")?;
    let addr = start_server(root.path())?;

    for _ in 0..5 {
        // Connect and hang up without sending anything.
        drop(TcpStream::connect(&addr)?);
    }
    let names = client::list(&addr)?;
    assert_eq!(names, vec!["still-here.txt".to_string()]);
    Ok(())
}
