//! HTSP message model and htsmsg binary codec.
//!
//! This crate defines the values, maps and wire encoding used to talk to a
//! Tvheadend server over HTSP, plus typed views of the replies and pushes the
//! client understands.
//!
//! # Frame Format
//!
//! ```text
//! +----------------+------------------------------+
//! | Length (u32 BE)| Payload: field*              |
//! +----------------+------------------------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use htsp_protocol::{decode_frame, encode_frame, Map};
//!
//! let hello = Map::new()
//!     .with("method", "hello")
//!     .with("htspversion", 27)
//!     .with("clientname", "demo")
//!     .with("seq", 1);
//!
//! let frame = encode_frame(&hello).unwrap();
//! let decoded = decode_frame(&frame).unwrap();
//! assert_eq!(decoded, hello);
//! assert_eq!(decoded.require_str("method").unwrap(), "hello");
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod value;

pub use codec::{
    decode_frame, decode_map, encode_frame, encode_map, peek_frame_len, LENGTH_PREFIX_SIZE,
    MAX_NESTING_DEPTH,
};
pub use error::{ClientError, DecodeError, EncodeError, FieldError, FramingError, TypeMismatch};
pub use types::{
    field, method, min_version, records, AsyncMessage, AsyncMetadataOptions, AutorecEntry,
    Channel, DiskSpace, DvrEntry, DvrState, DvrTarget, Event, EventQuery, HelloReply, NewDvrEntry,
    Service, SystemTime, Tag, DEFAULT_PORT, HTSP_PROTO_VERSION, MAX_FRAME_SIZE,
};
pub use value::{Map, Value, ValueKind};
