use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

use crate::logging::ComponentLogger;

// a single JSON document never needs more than this
const MAX_FRAME: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "archiveNow")]
    ArchiveNow,
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
    pub count: usize,
}

impl Response {
    pub fn new(status: impl Into<String>, count: usize) -> Self {
        Self {
            status: status.into(),
            count,
        }
    }
}

pub fn socket_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir"))?
        .join("rs_mail_archiver");
    std::fs::create_dir_all(&base)?;
    Ok(base.join("daemon.sock"))
}

/// Length-prefixed (u32, big endian) JSON frame.
pub fn write_frame<W: Write, T: Serialize>(w: &mut W, value: &T) -> Result<()> {
    let data = serde_json::to_vec(value)?;
    w.write_all(&(data.len() as u32).to_be_bytes())?;
    w.write_all(&data)?;
    w.flush()?;
    Ok(())
}

pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let n = u32::from_be_bytes(len_buf) as usize;
    if n > MAX_FRAME {
        return Err(anyhow!("frame of {n} bytes exceeds limit"));
    }
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Answer one request on an already accepted stream.
pub fn handle_stream<S, F>(stream: &mut S, handler: F) -> Result<Response>
where
    S: Read + Write,
    F: FnOnce(Request) -> Response,
{
    let raw = read_frame(stream)?;
    let resp = match serde_json::from_slice::<Request>(&raw) {
        Ok(req) => handler(req),
        Err(_) => Response::new("Unknown action", 0),
    };
    write_frame(stream, &resp)?;
    Ok(resp)
}

#[cfg(unix)]
pub fn send(req: &Request) -> Result<Response> {
    send_to(&socket_path()?, req)
}

#[cfg(unix)]
pub fn send_to(path: &Path, req: &Request) -> Result<Response> {
    let mut s = UnixStream::connect(path)
        .map_err(|e| anyhow!("cannot reach daemon at {}: {e}", path.display()))?;
    write_frame(&mut s, req)?;
    Ok(serde_json::from_slice(&read_frame(&mut s)?)?)
}

#[cfg(not(unix))]
pub fn send(_req: &Request) -> Result<Response> {
    Ok(Response::new("IPC not supported on this platform", 0))
}

#[cfg(not(unix))]
pub fn send_to(_path: &Path, _req: &Request) -> Result<Response> {
    send(_req)
}

/// Bind the daemon socket, replacing a stale one left by a previous run.
#[cfg(unix)]
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        if UnixStream::connect(path).is_ok() {
            return Err(anyhow!("another daemon is listening on {}", path.display()));
        }
        std::fs::remove_file(path)?;
    }
    Ok(UnixListener::bind(path)?)
}

/// Accept connections forever, one thread per connection. The handler runs
/// on that thread so a slow archive pass never blocks new requests.
#[cfg(unix)]
pub fn serve<F>(listener: UnixListener, handler: F, log: ComponentLogger) -> Result<()>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    let handler = std::sync::Arc::new(handler);
    for conn in listener.incoming() {
        let mut stream = match conn {
            Ok(s) => s,
            Err(e) => {
                log.warn("Accept failed", &[("error", &e)]);
                continue;
            }
        };
        let handler = handler.clone();
        let log = log.clone();
        std::thread::spawn(move || {
            if let Err(e) = handle_stream(&mut stream, |req| (*handler)(req)) {
                log.warn("IPC connection failed", &[("error", &e)]);
            }
        });
    }
    Ok(())
}
