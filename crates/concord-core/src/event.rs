//! Gateway event types.
//!
//! This module provides the typed event stream the core consumes:
//!
//! - [`EventKind`] - the finite set of event kinds the core subscribes to
//! - [`GatewayEvent`] - a tagged variant carrying each kind's typed payload
//!
//! Gateway implementations translate their wire frames into
//! [`GatewayEvent`]s; the dispatcher matches on them exhaustively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{
    ChannelPayload, GuildPayload, MemberPayload, MessagePayload, ReactionPayload, UserPayload,
};

// ============================================================================
// Event payloads that only exist on the gateway
// ============================================================================

/// Sent once the gateway session is established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    /// The account the client is logged in as.
    pub user: UserPayload,
    /// IDs of the guilds the account belongs to (delivered later as guild creates).
    #[serde(default)]
    pub guilds: Vec<String>,
}

/// A ban added to or removed from a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanPayload {
    pub guild_id: String,
    pub user: UserPayload,
}

/// A member left or was removed from a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRemovePayload {
    pub guild_id: String,
    pub user: UserPayload,
}

/// A guild became unavailable or the account left it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDeletePayload {
    pub id: String,
    /// `true` for an outage, `false` when the account left or was removed.
    #[serde(default)]
    pub unavailable: bool,
}

// ============================================================================
// Event Kind Classification
// ============================================================================

/// The kinds of gateway events the core subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    MessageCreate,
    MessageUpdate,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    MemberAdd,
    MemberUpdate,
    MemberRemove,
    BanAdd,
    BanRemove,
    ReactionAdd,
}

impl EventKind {
    /// Every kind, in the order the runtime subscribes to them.
    pub const ALL: [EventKind; 15] = [
        EventKind::Ready,
        EventKind::MessageCreate,
        EventKind::MessageUpdate,
        EventKind::GuildCreate,
        EventKind::GuildUpdate,
        EventKind::GuildDelete,
        EventKind::ChannelCreate,
        EventKind::ChannelUpdate,
        EventKind::ChannelDelete,
        EventKind::MemberAdd,
        EventKind::MemberUpdate,
        EventKind::MemberRemove,
        EventKind::BanAdd,
        EventKind::BanRemove,
        EventKind::ReactionAdd,
    ];

    /// Returns the gateway dispatch name (e.g. `MESSAGE_CREATE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ready => "READY",
            EventKind::MessageCreate => "MESSAGE_CREATE",
            EventKind::MessageUpdate => "MESSAGE_UPDATE",
            EventKind::GuildCreate => "GUILD_CREATE",
            EventKind::GuildUpdate => "GUILD_UPDATE",
            EventKind::GuildDelete => "GUILD_DELETE",
            EventKind::ChannelCreate => "CHANNEL_CREATE",
            EventKind::ChannelUpdate => "CHANNEL_UPDATE",
            EventKind::ChannelDelete => "CHANNEL_DELETE",
            EventKind::MemberAdd => "GUILD_MEMBER_ADD",
            EventKind::MemberUpdate => "GUILD_MEMBER_UPDATE",
            EventKind::MemberRemove => "GUILD_MEMBER_REMOVE",
            EventKind::BanAdd => "GUILD_BAN_ADD",
            EventKind::BanRemove => "GUILD_BAN_REMOVE",
            EventKind::ReactionAdd => "MESSAGE_REACTION_ADD",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or(())
    }
}

// ============================================================================
// Gateway Event
// ============================================================================

/// One inbound gateway event with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready(ReadyPayload),
    MessageCreate(MessagePayload),
    MessageUpdate(MessagePayload),
    GuildCreate(GuildPayload),
    GuildUpdate(GuildPayload),
    GuildDelete(GuildDeletePayload),
    ChannelCreate(ChannelPayload),
    ChannelUpdate(ChannelPayload),
    ChannelDelete(ChannelPayload),
    MemberAdd(MemberPayload),
    MemberUpdate(MemberPayload),
    MemberRemove(MemberRemovePayload),
    BanAdd(BanPayload),
    BanRemove(BanPayload),
    ReactionAdd(ReactionPayload),
}

impl GatewayEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::Ready(_) => EventKind::Ready,
            GatewayEvent::MessageCreate(_) => EventKind::MessageCreate,
            GatewayEvent::MessageUpdate(_) => EventKind::MessageUpdate,
            GatewayEvent::GuildCreate(_) => EventKind::GuildCreate,
            GatewayEvent::GuildUpdate(_) => EventKind::GuildUpdate,
            GatewayEvent::GuildDelete(_) => EventKind::GuildDelete,
            GatewayEvent::ChannelCreate(_) => EventKind::ChannelCreate,
            GatewayEvent::ChannelUpdate(_) => EventKind::ChannelUpdate,
            GatewayEvent::ChannelDelete(_) => EventKind::ChannelDelete,
            GatewayEvent::MemberAdd(_) => EventKind::MemberAdd,
            GatewayEvent::MemberUpdate(_) => EventKind::MemberUpdate,
            GatewayEvent::MemberRemove(_) => EventKind::MemberRemove,
            GatewayEvent::BanAdd(_) => EventKind::BanAdd,
            GatewayEvent::BanRemove(_) => EventKind::BanRemove,
            GatewayEvent::ReactionAdd(_) => EventKind::ReactionAdd,
        }
    }
}
