//! Async HTSP client for Tvheadend.
//!
//! The client keeps one connection per [`Session`]. Requests from any number of
//! tasks are multiplexed over that connection and matched to their replies by
//! sequence number; server pushes are routed to handlers registered by message
//! type.
//!
//! ```no_run
//! use htsp_client::{load_config, AsyncMetadataOptions, AsyncMessage, Session};
//!
//! # async fn run() -> Result<(), htsp_client::ClientError> {
//! htsp_client::logging::init_logging();
//!
//! let config = load_config();
//! let session = Session::connect(&config, None).await?;
//!
//! session.on_async(|msg| {
//!     if let AsyncMessage::ChannelAdd(ch) = msg {
//!         println!("{} {}", ch.number, ch.name);
//!     }
//! });
//! session.enable_async_metadata(&AsyncMetadataOptions::default()).await?;
//!
//! let disk = session.get_disk_space().await?;
//! println!("{} of {} bytes free", disk.free, disk.total);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
#[macro_use]
pub mod logging;
pub mod session;

pub use auth::{CredentialHasher, Credentials};
pub use client::{Connection, ConnectionConfig, ConnectionState};
pub use config::{load_config, load_config_from};
pub use session::{Session, PUSH_METHODS};

pub use htsp_protocol::{
    AsyncMessage, AsyncMetadataOptions, AutorecEntry, Channel, ClientError, DiskSpace, DvrEntry,
    DvrState, Event, EventQuery, HelloReply, Map, NewDvrEntry, SystemTime, Tag, Value,
};
