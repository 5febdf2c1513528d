//! Protocol constants and typed views of HTSP messages.
//!
//! Each record decodes from a [`Map`] with `TryFrom<&Map>`, failing with a
//! [`FieldError`] when a required field is absent or a field has the wrong type.
//! Optional fields that are absent become `None` (or an empty list).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::value::{Map, Value};

/// Protocol version announced in `hello`.
pub const HTSP_PROTO_VERSION: u32 = 17;

/// Maximum frame payload size (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Default Tvheadend HTSP port.
pub const DEFAULT_PORT: u16 = 9982;

/// Protocol field names.
pub mod field {
    pub const METHOD: &str = "method";
    pub const SEQ: &str = "seq";
    pub const ERROR: &str = "error";
    pub const NOACCESS: &str = "noaccess";
    pub const SUCCESS: &str = "success";

    pub const HTSP_VERSION: &str = "htspversion";
    pub const CLIENT_NAME: &str = "clientname";
    pub const CLIENT_VERSION: &str = "clientversion";
    pub const SERVER_NAME: &str = "servername";
    pub const SERVER_VERSION: &str = "serverversion";
    pub const SERVER_CAPABILITY: &str = "servercapability";
    pub const CHALLENGE: &str = "challenge";
    pub const WEBROOT: &str = "webroot";

    pub const USERNAME: &str = "username";
    pub const DIGEST: &str = "digest";

    pub const FREE_DISK_SPACE: &str = "freediskspace";
    pub const TOTAL_DISK_SPACE: &str = "totaldiskspace";
    pub const TIME: &str = "time";
    pub const TIMEZONE: &str = "timezone";
    pub const GMT_OFFSET: &str = "gmtoffset";

    pub const EPG: &str = "epg";
    pub const EPG_MAX_TIME: &str = "epgMaxTime";
    pub const LAST_UPDATE: &str = "lastUpdate";

    pub const CHANNEL_ID: &str = "channelId";
    pub const EVENT_ID: &str = "eventId";
    pub const NEXT_EVENT_ID: &str = "nextEventId";
    pub const NUM_FOLLOWING: &str = "numFollowing";
    pub const MAX_TIME: &str = "maxTime";
    pub const LANGUAGE: &str = "language";
    pub const EVENTS: &str = "events";
    pub const ID: &str = "id";
    pub const START: &str = "start";
    pub const STOP: &str = "stop";
}

/// RPC and push method names.
pub mod method {
    pub const HELLO: &str = "hello";
    pub const AUTHENTICATE: &str = "authenticate";
    pub const GET_DISK_SPACE: &str = "getDiskSpace";
    pub const GET_SYS_TIME: &str = "getSysTime";
    pub const ENABLE_ASYNC_METADATA: &str = "enableAsyncMetadata";
    pub const GET_CHANNEL: &str = "getChannel";
    pub const GET_EVENT: &str = "getEvent";
    pub const GET_EVENTS: &str = "getEvents";
    pub const ADD_DVR_ENTRY: &str = "addDvrEntry";
    pub const CANCEL_DVR_ENTRY: &str = "cancelDvrEntry";

    pub const CHANNEL_ADD: &str = "channelAdd";
    pub const CHANNEL_UPDATE: &str = "channelUpdate";
    pub const CHANNEL_DELETE: &str = "channelDelete";
    pub const TAG_ADD: &str = "tagAdd";
    pub const TAG_UPDATE: &str = "tagUpdate";
    pub const TAG_DELETE: &str = "tagDelete";
    pub const DVR_ENTRY_ADD: &str = "dvrEntryAdd";
    pub const DVR_ENTRY_UPDATE: &str = "dvrEntryUpdate";
    pub const DVR_ENTRY_DELETE: &str = "dvrEntryDelete";
    pub const AUTOREC_ENTRY_ADD: &str = "autorecEntryAdd";
    pub const AUTOREC_ENTRY_UPDATE: &str = "autorecEntryUpdate";
    pub const AUTOREC_ENTRY_DELETE: &str = "autorecEntryDelete";
    pub const EVENT_ADD: &str = "eventAdd";
    pub const EVENT_UPDATE: &str = "eventUpdate";
    pub const EVENT_DELETE: &str = "eventDelete";
    pub const INITIAL_SYNC_COMPLETED: &str = "initialSyncCompleted";
}

/// Minimum protocol versions for optional operations.
pub mod min_version {
    pub const DISK_SPACE: u32 = 3;
    pub const SYS_TIME: u32 = 3;
    pub const EVENTS: u32 = 4;
    pub const DVR_CONTROL: u32 = 5;
    pub const GET_CHANNEL: u32 = 14;
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(str::to_string)
}

/// Reply to `hello`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloReply {
    /// Highest protocol version the server supports.
    pub htsp_version: u32,
    pub server_name: String,
    pub server_version: String,
    /// Capability strings (version 6+).
    pub server_capabilities: Vec<String>,
    /// Random bytes the authentication digest is computed over.
    pub challenge: Bytes,
    /// HTTP webroot (version 8+).
    pub webroot: Option<String>,
}

impl TryFrom<&Map> for HelloReply {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            htsp_version: m.require_u32(field::HTSP_VERSION)?,
            server_name: m.require_str(field::SERVER_NAME)?.to_string(),
            server_version: m.require_str(field::SERVER_VERSION)?.to_string(),
            server_capabilities: m.string_list(field::SERVER_CAPABILITY)?,
            challenge: m
                .optional_bytes(field::CHALLENGE)?
                .cloned()
                .unwrap_or_default(),
            webroot: owned(m.optional_str(field::WEBROOT)?),
        })
    }
}

impl HelloReply {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.server_capabilities.iter().any(|c| c == capability)
    }
}

/// Reply to `getDiskSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSpace {
    /// Bytes available.
    pub free: i64,
    /// Total capacity in bytes.
    pub total: i64,
}

impl DiskSpace {
    /// Saturates rather than overflowing on nonsensical server values.
    pub fn used(&self) -> i64 {
        self.total.saturating_sub(self.free)
    }
}

impl TryFrom<&Map> for DiskSpace {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            free: m.require_i64(field::FREE_DISK_SPACE)?,
            total: m.require_i64(field::TOTAL_DISK_SPACE)?,
        })
    }
}

/// Reply to `getSysTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTime {
    /// UNIX time.
    pub time: i64,
    /// Minutes west of GMT.
    pub timezone: i32,
    /// Minutes east of GMT, DST included (version 26+).
    pub gmt_offset: Option<i32>,
}

impl SystemTime {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        timestamp(self.time)
    }
}

impl TryFrom<&Map> for SystemTime {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            time: m.require_i64(field::TIME)?,
            timezone: m.optional_i32(field::TIMEZONE)?.ok_or_else(|| {
                FieldError::Missing(field::TIMEZONE.to_string())
            })?,
            gmt_offset: m.optional_i32(field::GMT_OFFSET)?,
        })
    }
}

/// A service carried by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Full name, e.g. `Network/Mux/Service`.
    pub name: String,
    /// Service type, e.g. `SDTV`.
    pub service_type: String,
}

impl TryFrom<&Map> for Service {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            name: m.require_str("name")?.to_string(),
            service_type: m.optional_str("type")?.unwrap_or_default().to_string(),
        })
    }
}

/// `channelAdd` / `channelUpdate` / `getChannel` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u32,
    /// 0 means unconfigured.
    pub number: u32,
    pub number_minor: Option<u32>,
    pub name: String,
    pub icon: Option<String>,
    /// Current event on this channel.
    pub event_id: Option<u32>,
    pub next_event_id: Option<u32>,
    pub tags: Vec<u32>,
    pub services: Vec<Service>,
}

impl TryFrom<&Map> for Channel {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.require_u32(field::CHANNEL_ID)?,
            number: m.optional_u32("channelNumber")?.unwrap_or(0),
            number_minor: m.optional_u32("channelNumberMinor")?,
            name: m.require_str("channelName")?.to_string(),
            icon: owned(m.optional_str("channelIcon")?),
            event_id: m.optional_u32(field::EVENT_ID)?,
            next_event_id: m.optional_u32(field::NEXT_EVENT_ID)?,
            tags: m.u32_list("tags")?,
            services: records(m, "services")?,
        })
    }
}

/// `tagAdd` / `tagUpdate` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u32,
    pub name: String,
    pub icon: Option<String>,
    pub titled_icon: bool,
    /// Channel ids belonging to the tag.
    pub members: Vec<u32>,
}

impl TryFrom<&Map> for Tag {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.require_u32("tagId")?,
            name: m.require_str("tagName")?.to_string(),
            icon: owned(m.optional_str("tagIcon")?),
            titled_icon: m.optional_bool("tagTitledIcon")?.unwrap_or(false),
            members: m.u32_list("members")?,
        })
    }
}

/// Recording state of a DVR entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DvrState {
    Scheduled,
    Recording,
    Completed,
    Missed,
    Invalid,
    Other(String),
}

impl From<&str> for DvrState {
    fn from(s: &str) -> Self {
        match s {
            "scheduled" => DvrState::Scheduled,
            "recording" => DvrState::Recording,
            "completed" => DvrState::Completed,
            "missed" => DvrState::Missed,
            "invalid" => DvrState::Invalid,
            other => DvrState::Other(other.to_string()),
        }
    }
}

/// `dvrEntryAdd` / `dvrEntryUpdate` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvrEntry {
    pub id: u32,
    pub channel: Option<u32>,
    /// Scheduled start, UNIX time.
    pub start: i64,
    /// Scheduled stop, UNIX time.
    pub stop: i64,
    /// Pre-roll in minutes.
    pub start_extra: Option<i64>,
    /// Post-roll in minutes.
    pub stop_extra: Option<i64>,
    /// Retention in days.
    pub retention: Option<i64>,
    /// 0 = important .. 4 = unimportant, 5 = not set.
    pub priority: Option<u32>,
    pub event_id: Option<u32>,
    pub autorec_id: Option<String>,
    pub content_type: Option<u32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub state: Option<DvrState>,
    pub error: Option<String>,
}

impl DvrEntry {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start)
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        timestamp(self.stop)
    }

    pub fn duration_secs(&self) -> i64 {
        self.stop.saturating_sub(self.start)
    }
}

impl TryFrom<&Map> for DvrEntry {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.require_u32(field::ID)?,
            channel: m.optional_u32("channel")?,
            start: m.require_i64(field::START)?,
            stop: m.require_i64(field::STOP)?,
            start_extra: m.optional_i64("startExtra")?,
            stop_extra: m.optional_i64("stopExtra")?,
            retention: m.optional_i64("retention")?,
            priority: m.optional_u32("priority")?,
            event_id: m.optional_u32(field::EVENT_ID)?,
            autorec_id: owned(m.optional_str("autorecId")?),
            content_type: m.optional_u32("contentType")?,
            title: owned(m.optional_str("title")?),
            summary: owned(m.optional_str("summary")?),
            description: owned(m.optional_str("description")?),
            state: m.optional_str("state")?.map(DvrState::from),
            error: owned(m.optional_str(field::ERROR)?),
        })
    }
}

/// `autorecEntryAdd` / `autorecEntryUpdate` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutorecEntry {
    /// Autorec ids are strings.
    pub id: String,
    pub enabled: bool,
    pub retention: Option<u32>,
    pub priority: Option<u32>,
    pub title: Option<String>,
    pub channel: Option<u32>,
}

impl TryFrom<&Map> for AutorecEntry {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.require_str(field::ID)?.to_string(),
            enabled: m.optional_bool("enabled")?.unwrap_or(false),
            retention: m.optional_u32("retention")?,
            priority: m.optional_u32("priority")?,
            title: owned(m.optional_str("title")?),
            channel: m.optional_u32("channel")?,
        })
    }
}

/// `eventAdd` / `eventUpdate` / `getEvent` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u32,
    pub channel_id: u32,
    /// Start time, UNIX time.
    pub start: i64,
    /// Stop time, UNIX time.
    pub stop: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub series_link_id: Option<u32>,
    pub episode_id: Option<u32>,
    pub season_id: Option<u32>,
    pub brand_id: Option<u32>,
    pub content_type: Option<u32>,
    pub age_rating: Option<u32>,
    pub star_rating: Option<u32>,
    pub first_aired: Option<i64>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub dvr_id: Option<u32>,
    pub next_event_id: Option<u32>,
    pub episode_uri: Option<String>,
    pub series_link_uri: Option<String>,
}

impl Event {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start)
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        timestamp(self.stop)
    }

    pub fn duration_secs(&self) -> i64 {
        self.stop.saturating_sub(self.start)
    }
}

impl TryFrom<&Map> for Event {
    type Error = FieldError;

    fn try_from(m: &Map) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.require_u32(field::EVENT_ID)?,
            channel_id: m.require_u32(field::CHANNEL_ID)?,
            start: m.require_i64(field::START)?,
            stop: m.require_i64(field::STOP)?,
            title: owned(m.optional_str("title")?),
            summary: owned(m.optional_str("summary")?),
            description: owned(m.optional_str("description")?),
            series_link_id: m.optional_u32("serieslinkId")?,
            episode_id: m.optional_u32("episodeId")?,
            season_id: m.optional_u32("seasonId")?,
            brand_id: m.optional_u32("brandId")?,
            content_type: m.optional_u32("contentType")?,
            age_rating: m.optional_u32("ageRating")?,
            star_rating: m.optional_u32("starRating")?,
            first_aired: m.optional_i64("firstAired")?,
            season_number: m.optional_u32("seasonNumber")?,
            episode_number: m.optional_u32("episodeNumber")?,
            dvr_id: m.optional_u32("dvrId")?,
            next_event_id: m.optional_u32(field::NEXT_EVENT_ID)?,
            episode_uri: owned(m.optional_str("episodeUri")?),
            series_link_uri: owned(m.optional_str("serieslinkUri")?),
        })
    }
}

/// Decode every map in a list field as a record. A missing list is empty.
pub fn records<T>(m: &Map, name: &str) -> Result<Vec<T>, FieldError>
where
    T: for<'a> TryFrom<&'a Map, Error = FieldError>,
{
    let Some(items) = m.optional_list(name)? else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            let map = item.as_map().map_err(|source| FieldError::Mistyped {
                field: name.to_string(),
                source,
            })?;
            T::try_from(map)
        })
        .collect()
}

/// Arguments for `getEvents`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    /// Restrict to one channel.
    pub channel_id: Option<u32>,
    /// Start from this event.
    pub event_id: Option<u32>,
    /// Number of events following `event_id`.
    pub num_following: Option<u32>,
    /// Latest start time, UNIX time.
    pub max_time: Option<i64>,
    /// Preferred language for titles and descriptions.
    pub language: Option<String>,
}

impl EventQuery {
    pub fn for_channel(channel_id: u32) -> Self {
        Self {
            channel_id: Some(channel_id),
            ..Self::default()
        }
    }

    pub fn to_map(&self) -> Map {
        let mut m = Map::new();
        if let Some(v) = self.event_id {
            m.insert(field::EVENT_ID, v);
        }
        if let Some(v) = self.channel_id {
            m.insert(field::CHANNEL_ID, v);
        }
        if let Some(v) = self.num_following {
            m.insert(field::NUM_FOLLOWING, v);
        }
        if let Some(v) = self.max_time {
            m.insert(field::MAX_TIME, v);
        }
        if let Some(v) = &self.language {
            m.insert(field::LANGUAGE, v.as_str());
        }
        m
    }
}

/// Arguments for `enableAsyncMetadata`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncMetadataOptions {
    /// Also push EPG events.
    pub epg: bool,
    /// Only push events starting before this UNIX time.
    pub epg_max_time: Option<i64>,
    /// Only push changes since this UNIX time.
    pub last_update: Option<i64>,
}

impl AsyncMetadataOptions {
    pub fn to_map(&self) -> Map {
        let mut m = Map::new().with(field::EPG, self.epg);
        if let Some(v) = self.epg_max_time {
            m.insert(field::EPG_MAX_TIME, v);
        }
        if let Some(v) = self.last_update {
            m.insert(field::LAST_UPDATE, v);
        }
        m
    }
}

/// Arguments for `addDvrEntry`: either an EPG event or a manual time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DvrTarget {
    Event { event_id: u32 },
    Manual { channel_id: u32, start: i64, stop: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDvrEntry {
    pub target: DvrTarget,
    pub title: Option<String>,
    pub description: Option<String>,
    pub retention: Option<u32>,
    pub priority: Option<u32>,
    pub start_extra: Option<i64>,
    pub stop_extra: Option<i64>,
    pub config_name: Option<String>,
}

impl NewDvrEntry {
    pub fn for_event(event_id: u32) -> Self {
        Self::new(DvrTarget::Event { event_id })
    }

    pub fn manual(channel_id: u32, start: i64, stop: i64) -> Self {
        Self::new(DvrTarget::Manual {
            channel_id,
            start,
            stop,
        })
    }

    fn new(target: DvrTarget) -> Self {
        Self {
            target,
            title: None,
            description: None,
            retention: None,
            priority: None,
            start_extra: None,
            stop_extra: None,
            config_name: None,
        }
    }

    pub fn to_map(&self) -> Map {
        let mut m = Map::new();
        match self.target {
            DvrTarget::Event { event_id } => {
                m.insert(field::EVENT_ID, event_id);
            }
            DvrTarget::Manual {
                channel_id,
                start,
                stop,
            } => {
                m.insert(field::CHANNEL_ID, channel_id);
                m.insert(field::START, start);
                m.insert(field::STOP, stop);
            }
        }
        if let Some(v) = &self.title {
            m.insert("title", v.as_str());
        }
        if let Some(v) = &self.description {
            m.insert("description", v.as_str());
        }
        if let Some(v) = self.retention {
            m.insert("retention", v);
        }
        if let Some(v) = self.priority {
            m.insert("priority", v);
        }
        if let Some(v) = self.start_extra {
            m.insert("startExtra", v);
        }
        if let Some(v) = self.stop_extra {
            m.insert("stopExtra", v);
        }
        if let Some(v) = &self.config_name {
            m.insert("configName", v.as_str());
        }
        m
    }
}

/// A server push, decoded by its `method` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncMessage {
    ChannelAdd(Channel),
    ChannelUpdate(Map),
    ChannelDelete { id: u32 },
    TagAdd(Tag),
    TagUpdate(Map),
    TagDelete { id: u32 },
    DvrEntryAdd(DvrEntry),
    DvrEntryUpdate(Map),
    DvrEntryDelete { id: u32 },
    AutorecEntryAdd(AutorecEntry),
    AutorecEntryUpdate(Map),
    AutorecEntryDelete { id: String },
    EventAdd(Event),
    EventUpdate(Map),
    EventDelete { id: u32 },
    InitialSyncCompleted,
    /// A push this client does not model; kept verbatim.
    Other { method: String, message: Map },
}

impl AsyncMessage {
    /// Decode a push. Update messages carry only the changed fields, so they are
    /// kept as raw maps.
    pub fn from_map(m: &Map) -> Result<Self, FieldError> {
        let name = m.require_str(field::METHOD)?;
        Ok(match name {
            method::CHANNEL_ADD => AsyncMessage::ChannelAdd(Channel::try_from(m)?),
            method::CHANNEL_UPDATE => AsyncMessage::ChannelUpdate(m.clone()),
            method::CHANNEL_DELETE => AsyncMessage::ChannelDelete {
                id: m.require_u32(field::CHANNEL_ID)?,
            },
            method::TAG_ADD => AsyncMessage::TagAdd(Tag::try_from(m)?),
            method::TAG_UPDATE => AsyncMessage::TagUpdate(m.clone()),
            method::TAG_DELETE => AsyncMessage::TagDelete {
                id: m.require_u32("tagId")?,
            },
            method::DVR_ENTRY_ADD => AsyncMessage::DvrEntryAdd(DvrEntry::try_from(m)?),
            method::DVR_ENTRY_UPDATE => AsyncMessage::DvrEntryUpdate(m.clone()),
            method::DVR_ENTRY_DELETE => AsyncMessage::DvrEntryDelete {
                id: m.require_u32(field::ID)?,
            },
            method::AUTOREC_ENTRY_ADD => AsyncMessage::AutorecEntryAdd(AutorecEntry::try_from(m)?),
            method::AUTOREC_ENTRY_UPDATE => AsyncMessage::AutorecEntryUpdate(m.clone()),
            method::AUTOREC_ENTRY_DELETE => AsyncMessage::AutorecEntryDelete {
                id: m.require_str(field::ID)?.to_string(),
            },
            method::EVENT_ADD => AsyncMessage::EventAdd(Event::try_from(m)?),
            method::EVENT_UPDATE => AsyncMessage::EventUpdate(m.clone()),
            method::EVENT_DELETE => AsyncMessage::EventDelete {
                id: m.require_u32(field::EVENT_ID)?,
            },
            method::INITIAL_SYNC_COMPLETED => AsyncMessage::InitialSyncCompleted,
            other => AsyncMessage::Other {
                method: other.to_string(),
                message: m.clone(),
            },
        })
    }
}

/// Builds the list value for a `Vec<u32>` field.
pub fn u32_list_value(items: &[u32]) -> Value {
    Value::List(items.iter().map(|&v| Value::from(v)).collect())
}
