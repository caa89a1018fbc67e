//! Built-in room events.
//!
//! A room is a topic that clients join and leave by name. Every event reads
//! the room from the `room` field of its payload. Joining and leaving also
//! update [`Presence`] and tell the rest of the room with
//! [`PRESENCE_JOIN_EVENT`] and [`PRESENCE_LEAVE_EVENT`] frames.

use std::sync::Arc;

use serde_json::json;

use bamboo_core::HandlerResult;

use crate::context::{MessageContext, DEFAULT_ERROR_CODE};
use crate::error::RealtimeResult;
use crate::event::{EventAction, EventHandler};
use crate::frame::Frame;
use crate::presence::{Presence, PresenceEntry, PRESENCE_JOIN_EVENT, PRESENCE_LEAVE_EVENT};

/// Event that subscribes the connection to a room.
pub const JOIN_EVENT: &str = "rooms:join";

/// Event that unsubscribes the connection from a room.
pub const LEAVE_EVENT: &str = "rooms:leave";

/// Event that lists the members of a room the connection is in.
pub const MEMBERS_EVENT: &str = "rooms:members";

fn room_of(ctx: &MessageContext) -> Option<String> {
    ctx.param::<String>("room").filter(|r| !r.trim().is_empty())
}

pub(crate) fn join_frame(room: &str, entry: &PresenceEntry) -> serde_json::Result<String> {
    Frame::new(
        PRESENCE_JOIN_EVENT,
        json!({ "room": room, "key": entry.key, "online_since": entry.online_since }),
    )
    .encode()
}

pub(crate) fn leave_frame(room: &str, entry: &PresenceEntry) -> serde_json::Result<String> {
    Frame::new(PRESENCE_LEAVE_EVENT, json!({ "room": room, "key": entry.key })).encode()
}

async fn join(mut ctx: MessageContext, presence: Arc<Presence>) -> HandlerResult<MessageContext> {
    let Some(room) = room_of(&ctx) else {
        ctx.err("Missing room.", DEFAULT_ERROR_CODE)?;
        return Ok(ctx);
    };
    ctx.subscribe(&room);
    if let Some(entry) = presence.join(&room, ctx.session()) {
        ctx.session().broadcast(&room, &join_frame(&room, &entry)?);
    }
    ctx.json(json!({ "room": room }))?;
    Ok(ctx)
}

async fn leave(mut ctx: MessageContext, presence: Arc<Presence>) -> HandlerResult<MessageContext> {
    let Some(room) = room_of(&ctx) else {
        ctx.err("Missing room.", DEFAULT_ERROR_CODE)?;
        return Ok(ctx);
    };
    if ctx.is_subscribed(&room) {
        ctx.unsubscribe(&room);
    }
    if let Some(entry) = presence.leave(&room, ctx.connection_id()) {
        ctx.session().broadcast(&room, &leave_frame(&room, &entry)?);
    }
    ctx.lock();
    Ok(ctx)
}

async fn members(mut ctx: MessageContext, presence: Arc<Presence>) -> HandlerResult<MessageContext> {
    let Some(room) = room_of(&ctx) else {
        ctx.err("Missing room.", DEFAULT_ERROR_CODE)?;
        return Ok(ctx);
    };
    if !ctx.is_subscribed(&room) {
        ctx.err("Not in room.", DEFAULT_ERROR_CODE)?;
        return Ok(ctx);
    }
    let members = presence.members(&room);
    ctx.json(json!({ "room": room, "members": members }))?;
    Ok(ctx)
}

pub(crate) fn actions(presence: &Arc<Presence>) -> RealtimeResult<[EventAction; 3]> {
    let (p_join, p_leave, p_members) = (
        Arc::clone(presence),
        Arc::clone(presence),
        Arc::clone(presence),
    );
    Ok([
        EventAction::new(
            JOIN_EVENT,
            EventHandler::raw(move |ctx| join(ctx, Arc::clone(&p_join))),
        )?,
        EventAction::new(
            LEAVE_EVENT,
            EventHandler::raw(move |ctx| leave(ctx, Arc::clone(&p_leave))),
        )?,
        EventAction::new(
            MEMBERS_EVENT,
            EventHandler::raw(move |ctx| members(ctx, Arc::clone(&p_members))),
        )?,
    ])
}
