//! Plain payload snapshots of remote objects.
//!
//! Payloads are what the gateway and the REST collaborator hand to the core.
//! They carry no behaviour; the framework wraps them in cached entities.

mod channel;
mod guild;
mod message;
mod user;

pub use channel::{ChannelPayload, ChannelType};
pub use guild::{EmojiPayload, GuildPayload, MemberPayload, RolePayload};
pub use message::{MessagePayload, ReactionPayload};
pub use user::UserPayload;
