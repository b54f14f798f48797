use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a lightweight HTTP server that answers `200 OK` to everything.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server() -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    thread::spawn(move || handle_client(stream));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
        },
    ))
}

fn handle_client(mut stream: TcpStream) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let mut buffer = [0u8; 1024];
    if stream.read(&mut buffer).is_err() {
        return;
    }
    if stream
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK")
        .is_err()
    {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

/// In-process stand-in for the swarm coordinator: one accepted worker
/// connection speaking newline-delimited JSON.
pub struct FakeCoordinator {
    listener: TcpListener,
}

pub struct WorkerConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl FakeCoordinator {
    /// # Errors
    ///
    /// Returns an error if the listener cannot be created.
    pub fn bind() -> Result<Self, String> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|err| format!("bind coordinator failed: {}", err))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| format!("set_nonblocking failed: {}", err))?;
        Ok(Self { listener })
    }

    /// # Errors
    ///
    /// Returns an error if the local address is unavailable.
    pub fn port(&self) -> Result<u16, String> {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|err| format!("coordinator addr failed: {}", err))
    }

    /// Wait for the worker to connect.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when nobody connects in time.
    pub fn accept(&self, timeout: Duration) -> Result<WorkerConnection, String> {
        let start = Instant::now();
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .map_err(|err| format!("set_blocking failed: {}", err))?;
                    stream
                        .set_read_timeout(Some(Duration::from_millis(200)))
                        .map_err(|err| format!("set_read_timeout failed: {}", err))?;
                    let writer = stream
                        .try_clone()
                        .map_err(|err| format!("clone stream failed: {}", err))?;
                    return Ok(WorkerConnection {
                        reader: BufReader::new(stream),
                        writer,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        return Err("worker never connected".to_owned());
                    }
                    thread::sleep(Duration::from_millis(20));
                }
                Err(err) => return Err(format!("accept failed: {}", err)),
            }
        }
    }
}

impl WorkerConnection {
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written.
    pub fn send(&mut self, message: &serde_json::Value) -> Result<(), String> {
        let mut line = message.to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .map_err(|err| format!("send failed: {}", err))
    }

    /// Read frames until one of type `kind` arrives, skipping others.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, EOF, or an unparsable frame.
    pub fn expect(&mut self, kind: &str, timeout: Duration) -> Result<serde_json::Value, String> {
        self.expect_matching(kind, timeout, |_| true)
    }

    /// Like [`Self::expect`], additionally requiring `accept` to hold.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, EOF, or an unparsable frame.
    pub fn expect_matching<F>(
        &mut self,
        kind: &str,
        timeout: Duration,
        accept: F,
    ) -> Result<serde_json::Value, String>
    where
        F: Fn(&serde_json::Value) -> bool,
    {
        let start = Instant::now();
        let mut line = String::new();
        loop {
            if start.elapsed() > timeout {
                return Err(format!("timed out waiting for {}", kind));
            }
            match self.reader.read_line(&mut line) {
                Ok(0) => return Err(format!("connection closed waiting for {}", kind)),
                Ok(_) => {
                    let value: serde_json::Value = serde_json::from_str(line.trim_end())
                        .map_err(|err| format!("bad frame {:?}: {}", line, err))?;
                    line.clear();
                    let matches_kind =
                        value.get("type").and_then(serde_json::Value::as_str) == Some(kind);
                    if matches_kind && accept(&value) {
                        return Ok(value);
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) => {}
                Err(err) => return Err(format!("read failed: {}", err)),
            }
        }
    }

    /// Close the connection from the coordinator side.
    pub fn hang_up(self) {
        drop(self.writer.shutdown(Shutdown::Both));
    }
}

/// Spawn the `swarmer` binary.
///
/// # Errors
///
/// Returns an error if the process cannot be started.
pub fn spawn_swarmer<I, S>(args: I) -> Result<Child, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = swarmer_bin()?;
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "error")
        .env_remove("SWARMER_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("spawn swarmer failed: {}", err))
}

/// Wait for a child process to exit.
///
/// # Errors
///
/// Returns an error if waiting fails or the timeout is exceeded.
pub fn wait_for_exit(child: &mut Child, timeout: Duration) -> Result<ExitStatus, String> {
    let start = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|err| format!("wait failed: {}", err))?
        {
            return Ok(status);
        }
        if start.elapsed() > timeout {
            drop(child.kill());
            return Err("process timed out".to_owned());
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn swarmer_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_swarmer").map_or_else(
        || Err("CARGO_BIN_EXE_swarmer missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
