//! Typed HTSP operations on top of a [`Connection`].

use std::sync::Arc;

use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::RwLock;

use htsp_protocol::{
    field, method, min_version, records, AsyncMessage, AsyncMetadataOptions, Channel,
    ClientError, DiskSpace, Event, EventQuery, FieldError, HelloReply, Map, NewDvrEntry,
    SystemTime, HTSP_PROTO_VERSION,
};

use crate::auth::CredentialHasher;
use crate::client::{Connection, ConnectionConfig, ConnectionState};
use crate::file_log;

/// Push types decoded by [`Session::on_async`].
pub const PUSH_METHODS: &[&str] = &[
    method::CHANNEL_ADD,
    method::CHANNEL_UPDATE,
    method::CHANNEL_DELETE,
    method::TAG_ADD,
    method::TAG_UPDATE,
    method::TAG_DELETE,
    method::DVR_ENTRY_ADD,
    method::DVR_ENTRY_UPDATE,
    method::DVR_ENTRY_DELETE,
    method::AUTOREC_ENTRY_ADD,
    method::AUTOREC_ENTRY_UPDATE,
    method::AUTOREC_ENTRY_DELETE,
    method::EVENT_ADD,
    method::EVENT_UPDATE,
    method::EVENT_DELETE,
    method::INITIAL_SYNC_COMPLETED,
];

/// An HTSP session: one connection plus the handshake and credential state.
pub struct Session {
    conn: Connection,
    hello: RwLock<Option<HelloReply>>,
    /// `(username, digest)` attached to every request after `authenticate`.
    auth: RwLock<Option<(String, Bytes)>>,
}

impl Session {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            hello: RwLock::new(None),
            auth: RwLock::new(None),
        }
    }

    /// Connect over TCP, run `hello`, and authenticate when both credentials
    /// and a hasher are supplied.
    pub async fn connect(
        config: &ConnectionConfig,
        hasher: Option<&dyn CredentialHasher>,
    ) -> Result<Self, ClientError> {
        let conn = Connection::connect_tcp(config).await?;
        let session = Self::new(conn);

        let hello = session.hello(&config.client_name).await?;
        info!(
            "Server {} {} (HTSP v{})",
            hello.server_name, hello.server_version, hello.htsp_version
        );

        match (&config.credentials, hasher) {
            (Some(creds), Some(hasher)) => {
                session
                    .authenticate(&creds.username, &creds.password, hasher)
                    .await?;
            }
            (Some(_), None) => {
                warn!("Credentials configured without a credential hasher; staying anonymous");
            }
            (None, _) => {}
        }

        Ok(session)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// The `hello` reply, once the handshake has run.
    pub fn server_info(&self) -> Option<HelloReply> {
        self.hello.read().clone()
    }

    /// Protocol version negotiated in `hello`.
    pub fn server_version(&self) -> Option<u32> {
        self.hello.read().as_ref().map(|h| h.htsp_version)
    }

    fn require_version(&self, required: u32) -> Result<(), ClientError> {
        let server = self.server_version().ok_or(ClientError::NotConnected)?;
        if server < required {
            return Err(ClientError::UnsupportedVersion { required, server });
        }
        Ok(())
    }

    /// Issue a request with the session credentials attached and check the
    /// reply status.
    pub async fn request(&self, method: &str, mut args: Map) -> Result<Map, ClientError> {
        let auth = self.auth.read().clone();
        if let Some((username, digest)) = auth {
            args.insert(field::USERNAME, username);
            args.insert(field::DIGEST, digest);
        }
        let reply = self.conn.call(method, args).await?;
        check_reply(method, reply)
    }

    /// `hello`: announce the client and fetch the server identity and
    /// authentication challenge.
    pub async fn hello(&self, client_name: &str) -> Result<HelloReply, ClientError> {
        let args = Map::new()
            .with(field::HTSP_VERSION, HTSP_PROTO_VERSION)
            .with(field::CLIENT_NAME, client_name)
            .with(field::CLIENT_VERSION, env!("CARGO_PKG_VERSION"));

        let reply = self.conn.call(method::HELLO, args).await?;
        let reply = check_reply(method::HELLO, reply)?;
        let hello: HelloReply = decode(method::HELLO, &reply)?;

        debug!(
            "hello: server v{}, {} capabilities",
            hello.htsp_version,
            hello.server_capabilities.len()
        );
        file_log!(info, "hello: {} {}", hello.server_name, hello.server_version);
        *self.hello.write() = Some(hello.clone());
        Ok(hello)
    }

    /// `authenticate`: prove the password against the `hello` challenge.
    ///
    /// On success every later request carries the same username and digest.
    /// A `hello` reply without a challenge is a protocol violation.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        hasher: &dyn CredentialHasher,
    ) -> Result<(), ClientError> {
        let challenge = self
            .hello
            .read()
            .as_ref()
            .map(|h| h.challenge.clone())
            .ok_or(ClientError::NotConnected)?;
        if challenge.is_empty() {
            return Err(ClientError::violation(
                method::HELLO,
                FieldError::Missing(field::CHALLENGE.to_string()),
            ));
        }

        let digest = Bytes::from(hasher.digest(username, password, &challenge));
        let args = Map::new()
            .with(field::USERNAME, username)
            .with(field::DIGEST, digest.clone());

        let reply = self.conn.call(method::AUTHENTICATE, args).await?;
        check_reply(method::AUTHENTICATE, reply)?;

        *self.auth.write() = Some((username.to_string(), digest));
        self.conn.set_authenticated();
        info!("Authenticated as {}", username);
        Ok(())
    }

    pub async fn get_disk_space(&self) -> Result<DiskSpace, ClientError> {
        self.require_version(min_version::DISK_SPACE)?;
        let reply = self.request(method::GET_DISK_SPACE, Map::new()).await?;
        decode(method::GET_DISK_SPACE, &reply)
    }

    pub async fn get_sys_time(&self) -> Result<SystemTime, ClientError> {
        self.require_version(min_version::SYS_TIME)?;
        let reply = self.request(method::GET_SYS_TIME, Map::new()).await?;
        decode(method::GET_SYS_TIME, &reply)
    }

    /// `enableAsyncMetadata`: start the push stream.
    ///
    /// Handlers must already be registered; pushes for unregistered types are
    /// dropped.
    pub async fn enable_async_metadata(
        &self,
        options: &AsyncMetadataOptions,
    ) -> Result<(), ClientError> {
        self.request(method::ENABLE_ASYNC_METADATA, options.to_map())
            .await?;
        Ok(())
    }

    pub async fn get_channel(&self, channel_id: u32) -> Result<Channel, ClientError> {
        self.require_version(min_version::GET_CHANNEL)?;
        let args = Map::new().with(field::CHANNEL_ID, channel_id);
        let reply = self.request(method::GET_CHANNEL, args).await?;
        decode(method::GET_CHANNEL, &reply)
    }

    pub async fn get_event(
        &self,
        event_id: u32,
        language: Option<&str>,
    ) -> Result<Event, ClientError> {
        self.require_version(min_version::EVENTS)?;
        let mut args = Map::new().with(field::EVENT_ID, event_id);
        if let Some(language) = language {
            args.insert(field::LANGUAGE, language);
        }
        let reply = self.request(method::GET_EVENT, args).await?;
        decode(method::GET_EVENT, &reply)
    }

    /// `getEvents`: a reply without an `events` list means no events.
    pub async fn get_events(&self, query: &EventQuery) -> Result<Vec<Event>, ClientError> {
        self.require_version(min_version::EVENTS)?;
        let reply = self.request(method::GET_EVENTS, query.to_map()).await?;
        records(&reply, field::EVENTS)
            .map_err(|e| ClientError::violation(method::GET_EVENTS, e))
    }

    /// `addDvrEntry`: schedule a recording, returning the new entry id.
    pub async fn add_dvr_entry(&self, entry: &NewDvrEntry) -> Result<u32, ClientError> {
        self.require_version(min_version::DVR_CONTROL)?;
        let reply = self.request(method::ADD_DVR_ENTRY, entry.to_map()).await?;
        check_success(method::ADD_DVR_ENTRY, &reply)?;
        reply
            .require_u32(field::ID)
            .map_err(|e| ClientError::violation(method::ADD_DVR_ENTRY, e))
    }

    pub async fn cancel_dvr_entry(&self, id: u32) -> Result<(), ClientError> {
        self.require_version(min_version::DVR_CONTROL)?;
        let args = Map::new().with(field::ID, id);
        let reply = self.request(method::CANCEL_DVR_ENTRY, args).await?;
        check_success(method::CANCEL_DVR_ENTRY, &reply)
    }

    /// Register a raw handler for one push type.
    pub fn register_handler<F>(&self, method: &str, handler: F)
    where
        F: Fn(&Map) + Send + Sync + 'static,
    {
        self.conn.register_handler(method, handler);
    }

    pub fn unregister_handler(&self, method: &str) -> bool {
        self.conn.unregister_handler(method)
    }

    /// Register one handler for every push in [`PUSH_METHODS`], decoded into
    /// [`AsyncMessage`]. Pushes that fail to decode are logged and skipped.
    pub fn on_async<F>(&self, handler: F)
    where
        F: Fn(AsyncMessage) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        for &name in PUSH_METHODS {
            let handler = Arc::clone(&handler);
            self.conn
                .register_handler(name, move |map| match AsyncMessage::from_map(map) {
                    Ok(msg) => handler(msg),
                    Err(e) => warn!("Undecodable push {}: {}", name, e),
                });
        }
    }

    pub fn close(&self) {
        self.conn.close();
    }

    /// Resolves when the connection ends; see [`Connection::closed`].
    pub async fn closed(&self) -> Option<ClientError> {
        self.conn.closed().await
    }
}

fn decode<T>(method: &str, reply: &Map) -> Result<T, ClientError>
where
    T: for<'a> TryFrom<&'a Map, Error = FieldError>,
{
    T::try_from(reply).map_err(|e| ClientError::violation(method, e))
}

/// Map `noaccess` and `error` replies to errors.
fn check_reply(method: &str, reply: Map) -> Result<Map, ClientError> {
    if let Ok(Some(true)) = reply.optional_bool(field::NOACCESS) {
        return Err(ClientError::AccessDenied(method.to_string()));
    }
    if let Some(message) = reply.get(field::ERROR) {
        let message = match message.as_str() {
            Ok(s) => s.to_string(),
            Err(_) => format!("{:?}", message),
        };
        return Err(ClientError::ServerError {
            method: method.to_string(),
            message,
        });
    }
    Ok(reply)
}

/// DVR replies signal failure with `success = 0`.
fn check_success(method: &str, reply: &Map) -> Result<(), ClientError> {
    match reply.optional_bool(field::SUCCESS) {
        Ok(Some(true)) => Ok(()),
        Ok(Some(false)) => Err(ClientError::ServerError {
            method: method.to_string(),
            message: "request failed".to_string(),
        }),
        Ok(None) => Err(ClientError::violation(
            method,
            FieldError::Missing(field::SUCCESS.to_string()),
        )),
        Err(e) => Err(ClientError::violation(method, e)),
    }
}
