// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Outgoing frame builders for the handshake, login triad, and the
//! public action API. Each function takes the packet-id table plus its
//! arguments and returns a ready-to-send `OutFrame` (or, for multi-frame
//! actions, a `Vec<OutFrame>` in send order).

use rand::{Rng, RngExt, distr::Alphanumeric};

use crate::{cfg::config::OutgoingIds, codec::frame::OutFrame};

pub fn client_hello(
    ids: &OutgoingIds,
    release_version: &str,
    client_type: &str,
    platform_id: i32,
    client_version: i32,
) -> OutFrame {
    let mut f = OutFrame::new(ids.client_hello);
    f.write_string(release_version)
        .write_string(client_type)
        .write_i32(platform_id)
        .write_i32(client_version);
    f
}

pub fn dh_init(ids: &OutgoingIds) -> OutFrame {
    OutFrame::new(ids.dh_init)
}

pub fn dh_complete(ids: &OutgoingIds, encrypted_public_hex: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.dh_complete);
    f.write_string(encrypted_public_hex);
    f
}

pub fn version_check(
    ids: &OutgoingIds,
    locale: i32,
    external_variables_url: &str,
) -> OutFrame {
    let mut f = OutFrame::new(ids.version_check);
    f.write_i32(locale).write_string("app:/").write_string(external_variables_url);
    f
}

pub fn unique_id(ids: &OutgoingIds, device_fingerprint: &str, platform_string: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.unique_id);
    f.write_string(device_fingerprint).write_string(platform_string);
    f
}

pub fn sso_ticket(ids: &OutgoingIds, ticket: &str, elapsed_ms: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.sso_ticket);
    f.write_string(ticket).write_i32(elapsed_ms);
    f
}

pub fn info_retrieve(ids: &OutgoingIds) -> OutFrame {
    OutFrame::new(ids.info_retrieve)
}

pub fn pong(ids: &OutgoingIds) -> OutFrame {
    OutFrame::new(ids.pong)
}

pub fn latency_ping_request(ids: &OutgoingIds, request_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.latency_ping_request);
    f.write_i32(request_id);
    f
}

/// Wraps a shout message with a random 4-letter prefix/suffix unless it
/// looks like a command (starts with `:` or `/`). Picks a random style in
/// `[0, 30]` when `style` is `-1`.
pub fn shout(ids: &OutgoingIds, message: &str, style: i32) -> OutFrame {
    let mut rng = rand::rng();
    let chosen_style = if style == -1 { rng.random_range(0..=30) } else { style };

    let final_message = if message.starts_with(':') || message.starts_with('/') {
        message.to_string()
    } else {
        let prefix = random_uppercase(&mut rng, 4);
        let suffix = random_uppercase(&mut rng, 4);
        format!("{prefix} {message} {suffix}")
    };

    let mut f = OutFrame::new(ids.shout);
    f.write_string(&final_message).write_i32(chosen_style);
    f
}

fn random_uppercase(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(Alphanumeric)
        .filter(u8::is_ascii_uppercase)
        .take(len)
        .map(char::from)
        .chain(std::iter::repeat('X'))
        .take(len)
        .collect()
}

pub fn whisper(ids: &OutgoingIds, target_name: &str, message: &str, style: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.whisper);
    f.write_string(&format!("{target_name} {message}")).write_i32(style);
    f
}

pub fn walk(ids: &OutgoingIds, x: i32, y: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.walk);
    f.write_i32(x).write_i32(y);
    f
}

/// The four-frame sequence that enters a room: preload, clear any active
/// effect, signal readiness, then finalize. Order matters and the caller
/// must send them through the single send-mutex in this order.
pub fn join_room_sequence(ids: &OutgoingIds, room_id: i32) -> Vec<OutFrame> {
    let mut preload = OutFrame::new(ids.join_room);
    preload.write_i32(room_id).write_i32(0).write_i32(1);

    let mut clear_effect = OutFrame::new(ids.effect_select);
    clear_effect.write_i32(-1);

    let ready = OutFrame::new(ids.join_room_ready);

    let mut finalize = OutFrame::new(ids.join_room_flat);
    finalize.write_i32(room_id).write_i32(1).write_i32(0);

    vec![preload, clear_effect, ready, finalize]
}

pub fn change_motto(ids: &OutgoingIds, motto: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.change_motto);
    f.write_string(motto);
    f
}

pub fn update_figure(ids: &OutgoingIds, gender: &str, figure: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.update_figure);
    f.write_string(gender).write_string(figure);
    f
}

pub fn request_friend(ids: &OutgoingIds, user: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.request_friend);
    f.write_string(user);
    f
}

pub fn change_username(ids: &OutgoingIds, name: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.change_username);
    f.write_string(name);
    f
}

pub fn dance(ids: &OutgoingIds, move_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.dance);
    f.write_i32(move_id);
    f
}

pub fn sign(ids: &OutgoingIds, sign_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.sign);
    f.write_i32(sign_id);
    f
}

pub fn change_posture(ids: &OutgoingIds, posture_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.change_posture);
    f.write_i32(posture_id);
    f
}

pub fn respect_user(ids: &OutgoingIds, room_index: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.respect_user);
    f.write_i32(room_index);
    f
}

pub fn replenish_respect(ids: &OutgoingIds) -> OutFrame {
    OutFrame::new(ids.replenish_respect)
}

pub fn reward_status(ids: &OutgoingIds) -> OutFrame {
    OutFrame::new(ids.reward_status)
}

pub fn reward_claim(ids: &OutgoingIds, reward_type: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.reward_claim);
    f.write_i32(reward_type);
    f
}

pub fn purchase_item(
    ids: &OutgoingIds,
    page_id: i32,
    item_id: i32,
    extra_data: &str,
    amount: i32,
) -> OutFrame {
    let mut f = OutFrame::new(ids.purchase_item);
    f.write_i32(page_id).write_i32(item_id).write_string(extra_data).write_i32(amount);
    f
}

pub fn effect_activate(ids: &OutgoingIds, effect_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.effect_activate);
    f.write_i32(effect_id);
    f
}

pub fn effect_select(ids: &OutgoingIds, effect_id: i32) -> OutFrame {
    let mut f = OutFrame::new(ids.effect_select);
    f.write_i32(effect_id);
    f
}

pub fn search_navigator(ids: &OutgoingIds, category: &str, value: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.search_navigator);
    f.write_string(category).write_string(value);
    f
}

pub fn select_initial_room(ids: &OutgoingIds, template: &str) -> OutFrame {
    let mut f = OutFrame::new(ids.select_initial_room);
    f.write_string(template);
    f
}
