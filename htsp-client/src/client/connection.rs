//! Connection management for the HTSP client.
//!
//! A single background task owns the stream. It writes queued frames one at a
//! time and feeds everything it reads through the [`Framer`] into the
//! [`Dispatcher`]. When the task ends, for whatever reason, every pending call
//! fails with `ConnectionClosed` and the state becomes `Disconnected`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};

use htsp_protocol::{ClientError, Map, DEFAULT_PORT, MAX_FRAME_SIZE};

use crate::auth::Credentials;
use crate::client::dispatcher::Dispatcher;
use crate::client::framer::{encode_request, Framer};
use crate::file_log;

/// Depth of the outbound frame queue.
const OUTBOUND_QUEUE: usize = 64;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Stream is open, not authenticated.
    Connected,
    /// `authenticate` succeeded.
    Authenticated,
    /// Terminal.
    Disconnected,
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `host:port` of the Tvheadend server.
    pub server_addr: String,
    /// Sent as `clientname` in `hello`.
    pub client_name: String,
    /// Used by `Session::connect` to authenticate after `hello`.
    pub credentials: Option<Credentials>,
    pub connect_timeout: Duration,
    /// Default timeout for each call.
    pub call_timeout: Duration,
    /// Largest inbound frame payload accepted.
    pub max_frame_size: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            client_name: "htsp-client".to_string(),
            credentials: None,
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// State shared between the handle and the background task.
struct Shared {
    dispatcher: Dispatcher,
    state: Mutex<ConnectionState>,
    outbound: mpsc::Sender<Bytes>,
    shutdown: Notify,
    /// `None` while running; `Some(reason)` once the task has ended.
    closed: watch::Sender<Option<Option<ClientError>>>,
}

/// Handle to a running HTSP connection.
///
/// Dropping the handle stops the background task.
pub struct Connection {
    shared: Arc<Shared>,
    call_timeout: Duration,
}

impl Connection {
    /// Start the connection task over an already-open stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(stream: S, config: &ConnectionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::start_split(reader, writer, config)
    }

    fn start_split<R, W>(reader: R, writer: W, config: &ConnectionConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE);
        let (closed_tx, _) = watch::channel(None);

        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(),
            state: Mutex::new(ConnectionState::Connected),
            outbound: out_tx,
            shutdown: Notify::new(),
            closed: closed_tx,
        });

        let task_shared = Arc::clone(&shared);
        let max_frame_size = config.max_frame_size;
        tokio::spawn(async move {
            file_log!(info, "connection_task: started");
            let result =
                connection_loop(&task_shared, out_rx, reader, writer, max_frame_size).await;
            let reason = match result {
                Ok(()) => {
                    info!("Connection closed");
                    None
                }
                Err(e) => {
                    error!("Connection terminated: {}", e);
                    crate::logging::log_error("connection_task", &e);
                    Some(e)
                }
            };
            teardown(&task_shared, reason);
            file_log!(info, "connection_task: ended");
        });

        Self {
            shared,
            call_timeout: config.call_timeout,
        }
    }

    /// Open a TCP connection and start the connection task.
    pub async fn connect_tcp(config: &ConnectionConfig) -> Result<Self, ClientError> {
        info!("Connecting to {}...", config.server_addr);
        file_log!(debug, "connect_tcp: timeout {:?}", config.connect_timeout);

        let stream = match tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(&config.server_addr),
        )
        .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                file_log!(error, "connect_tcp: TCP connect failed: {}", e);
                return Err(ClientError::ConnectionFailed(format!(
                    "{}: {}",
                    config.server_addr, e
                )));
            }
            Err(_) => {
                file_log!(error, "connect_tcp: TCP connect timeout");
                return Err(ClientError::ConnectionFailed(format!(
                    "{}: timed out after {:?}",
                    config.server_addr, config.connect_timeout
                )));
            }
        };

        stream.set_nodelay(true)?;
        info!("Connected to {}", config.server_addr);
        file_log!(info, "connect_tcp: connected to {}", config.server_addr);

        let (reader, writer) = stream.into_split();
        Ok(Self::start_split(reader, writer, config))
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Move `Connected` to `Authenticated`. No effect in any other state.
    pub fn set_authenticated(&self) {
        let mut state = self.shared.state.lock();
        if *state == ConnectionState::Connected {
            *state = ConnectionState::Authenticated;
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Number of calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.dispatcher.pending_count()
    }

    /// Send a request and wait for its reply, using the configured timeout.
    pub async fn call(&self, method: &str, args: Map) -> Result<Map, ClientError> {
        self.call_with_timeout(method, args, self.call_timeout).await
    }

    /// Send a request and wait at most `timeout` for its reply.
    ///
    /// A reply that arrives after the timeout is dropped.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        args: Map,
        timeout: Duration,
    ) -> Result<Map, ClientError> {
        let dispatcher = &self.shared.dispatcher;
        let call = dispatcher.begin_call(method, args)?;
        let seq = call.seq;

        let frame = match encode_request(&call.request) {
            Ok(frame) => frame,
            Err(e) => {
                dispatcher.cancel(seq);
                return Err(e.into());
            }
        };

        debug!("[Connection] Sending {} seq={} ({} bytes)", method, seq, frame.len());
        if self.shared.outbound.send(frame).await.is_err() {
            dispatcher.cancel(seq);
            return Err(ClientError::ConnectionClosed);
        }

        match tokio::time::timeout(timeout, call.completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                dispatcher.cancel(seq);
                warn!("[Connection] {} seq={} timed out after {:?}", method, seq, timeout);
                Err(ClientError::Timeout {
                    method: method.to_string(),
                    seq,
                })
            }
        }
    }

    /// Register the handler for one push type. Register before
    /// `enableAsyncMetadata`; pushes with no handler are dropped.
    pub fn register_handler<F>(&self, method: &str, handler: F)
    where
        F: Fn(&Map) + Send + Sync + 'static,
    {
        self.shared.dispatcher.register_handler(method, handler);
    }

    pub fn unregister_handler(&self, method: &str) -> bool {
        self.shared.dispatcher.unregister_handler(method)
    }

    /// Ask the background task to stop. Pending calls fail with
    /// `ConnectionClosed`.
    pub fn close(&self) {
        self.shared.shutdown.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.borrow().is_some()
    }

    /// Resolves once the connection task has ended, with the error that ended
    /// it (`None` after a local [`close`](Self::close)).
    pub async fn closed(&self) -> Option<ClientError> {
        let mut rx = self.shared.closed.subscribe();
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().flatten(),
            Err(_) => Some(ClientError::ConnectionClosed),
        };
        reason
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn teardown(shared: &Shared, reason: Option<ClientError>) {
    *shared.state.lock() = ConnectionState::Disconnected;
    shared.dispatcher.fail_all();
    shared.closed.send_replace(Some(reason));
}

/// Main connection loop handling reads and writes.
async fn connection_loop<R, W>(
    shared: &Shared,
    mut out_rx: mpsc::Receiver<Bytes>,
    mut reader: R,
    mut writer: W,
    max_frame_size: u32,
) -> Result<(), ClientError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut framer = Framer::new(max_frame_size);

    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => {
                debug!("Shutdown requested");
                let _ = writer.shutdown().await;
                return Ok(());
            }

            // Outgoing requests, one whole frame per write.
            frame = out_rx.recv() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                trace!("Writing frame: {} bytes", frame.len());
                writer.write_all(&frame).await?;
            }

            // Incoming data
            result = reader.read_buf(framer.buffer_mut()) => {
                let n = result?;
                if n == 0 {
                    info!("Connection closed by server");
                    return Err(ClientError::ConnectionClosed);
                }

                while let Some(map) = framer.next_frame()? {
                    shared.dispatcher.on_frame(map);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use htsp_protocol::{decode_frame, encode_frame, peek_frame_len, FramingError};
    use tokio::io::DuplexStream;

    /// Read one request frame from the server side of a duplex.
    async fn read_request(server: &mut DuplexStream) -> Map {
        let mut prefix = [0u8; 4];
        server.read_exact(&mut prefix).await.unwrap();
        let len = peek_frame_len(&prefix).unwrap() as usize;
        let mut frame = prefix.to_vec();
        frame.resize(4 + len, 0);
        server.read_exact(&mut frame[4..]).await.unwrap();
        decode_frame(&frame).unwrap()
    }

    async fn write_map(server: &mut DuplexStream, map: &Map) {
        server.write_all(&encode_frame(map).unwrap()).await.unwrap();
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            call_timeout: Duration::from_secs(5),
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn test_config_debug_hides_password() {
        let config = ConnectionConfig {
            credentials: Some(Credentials::new("viewer", "hunter2")),
            ..ConnectionConfig::default()
        };
        let shown = format!("{:?}", config);
        assert!(shown.contains("viewer"));
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_resolve_out_of_order() {
        let (client, mut server) = tokio::io::duplex(4096);
        let conn = Connection::start(client, &config());

        let calls = join_all((0..3).map(|i| {
            conn.call("getEvent", Map::new().with("eventId", 100 + i))
        }));

        let server_side = async {
            let mut requests = Vec::new();
            for _ in 0..3 {
                requests.push(read_request(&mut server).await);
            }
            for idx in [2usize, 0, 1] {
                let req = &requests[idx];
                let reply = Map::new()
                    .with("eventId", req.require_i64("eventId").unwrap())
                    .with("seq", req.require_u32("seq").unwrap());
                write_map(&mut server, &reply).await;
            }
        };

        let (results, ()) = tokio::join!(calls, server_side);
        for (i, result) in results.into_iter().enumerate() {
            let reply = result.unwrap();
            assert_eq!(reply.require_i64("eventId"), Ok(100 + i as i64));
        }
        assert_eq!(conn.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_then_next_call() {
        let (client, mut server) = tokio::io::duplex(4096);
        let conn = Connection::start(client, &config());

        let slow = conn
            .call_with_timeout("getSysTime", Map::new(), Duration::from_millis(50))
            .await;
        assert_eq!(
            slow,
            Err(ClientError::Timeout {
                method: "getSysTime".to_string(),
                seq: 1
            })
        );
        assert_eq!(conn.pending_calls(), 0);

        let late = read_request(&mut server).await;
        write_map(&mut server, &Map::new().with("seq", late.require_u32("seq").unwrap()))
            .await;

        let next = conn.call("getDiskSpace", Map::new());
        let server_side = async {
            let req = read_request(&mut server).await;
            assert_eq!(req.require_str("method"), Ok("getDiskSpace"));
            let reply = Map::new()
                .with("freediskspace", 10)
                .with("totaldiskspace", 20)
                .with("seq", req.require_u32("seq").unwrap());
            write_map(&mut server, &reply).await;
        };
        let (reply, ()) = tokio::join!(next, server_side);
        let reply = reply.unwrap();
        assert_eq!(reply.require_u32("seq"), Ok(2));
        assert_eq!(reply.require_i64("freediskspace"), Ok(10));
    }

    #[tokio::test]
    async fn test_server_close_fails_pending_calls() {
        let (client, mut server) = tokio::io::duplex(4096);
        let conn = Connection::start(client, &config());

        let calls = join_all((0..3).map(|_| conn.call("hello", Map::new())));
        let server_side = async move {
            for _ in 0..3 {
                read_request(&mut server).await;
            }
            drop(server);
        };

        let (results, ()) = tokio::join!(calls, server_side);
        for result in results {
            assert_eq!(result, Err(ClientError::ConnectionClosed));
        }
        assert_eq!(conn.closed().await, Some(ClientError::ConnectionClosed));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(
            conn.call("hello", Map::new()).await,
            Err(ClientError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_framing_error_is_fatal() {
        let (client, mut server) = tokio::io::duplex(4096);
        let conn = Connection::start(client, &config());

        server.write_all(&[0, 0, 0, 3, 9, 0, 0]).await.unwrap();

        assert!(matches!(
            conn.closed().await,
            Some(ClientError::Framing(FramingError::Decode(_)))
        ));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_local_close() {
        let (client, _server) = tokio::io::duplex(4096);
        let conn = Connection::start(client, &config());
        assert_eq!(conn.state(), ConnectionState::Connected);

        conn.set_authenticated();
        assert_eq!(conn.state(), ConnectionState::Authenticated);

        conn.close();
        assert_eq!(conn.closed().await, None);
        assert!(conn.is_closed());

        conn.set_authenticated();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
