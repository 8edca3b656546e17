// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Navigator search-results parser. The wire schema is hierarchical
//! (blocks of rooms, each room with optional trailing sections gated by a
//! bitmask) but the crate only surfaces the flattened room list — nothing
//! downstream needs block/category grouping.

use crate::codec::frame::InFrame;

#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorRoom {
    pub flat_id: i32,
    pub room_name: String,
    pub owner_name: String,
    pub user_count: i32,
    pub max_user_count: i32,
    pub description: String,
}

/// Parses a navigator-results frame body into a flat list of rooms across
/// every block it contains.
pub fn parse_navigator_results(body: &[u8]) -> Vec<NavigatorRoom> {
    let mut buf = InFrame::new(body);
    let mut rooms = Vec::new();

    let _search_code = buf.read_string();
    let _search_text = buf.read_string();
    let block_count = buf.read_i32().max(0);

    for _ in 0..block_count {
        let _category_code = buf.read_string();
        let _category_text = buf.read_string();
        let _action_allowed = buf.read_i32();
        let _is_collapsed = buf.read_bool();
        let _view_mode = buf.read_i32();

        let room_count = buf.read_i32().max(0);
        for _ in 0..room_count {
            let flat_id = buf.read_i32();
            let room_name = buf.read_string();
            let _owner_id = buf.read_i32();
            let owner_name = buf.read_string();
            let _door_mode = buf.read_i32();
            let user_count = buf.read_i32();
            let max_user_count = buf.read_i32();
            let description = buf.read_string();
            let _trade_mode = buf.read_i32();
            let _score = buf.read_i32();
            let _ranking = buf.read_i32();
            let _category_id = buf.read_i32();

            let tag_count = buf.read_i32().max(0);
            for _ in 0..tag_count {
                let _tag = buf.read_string();
            }

            let bitmask = buf.read_i32();
            if bitmask & 1 != 0 {
                let _official_name = buf.read_string();
            }
            if bitmask & 2 != 0 {
                let _group_id = buf.read_i32();
                let _group_name = buf.read_string();
                let _group_badge = buf.read_string();
            }
            if bitmask & 4 != 0 {
                let _promo_name = buf.read_string();
                let _promo_desc = buf.read_string();
                let _promo_minutes = buf.read_i32();
            }

            rooms.push(NavigatorRoom {
                flat_id,
                room_name,
                owner_name,
                user_count,
                max_user_count,
                description,
            });
        }
    }

    rooms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame::OutFrame;

    #[test]
    fn parses_single_block_single_room_no_bitmask_tail() {
        let mut out = OutFrame::new(0);
        out.write_string("official_view")
            .write_string("")
            .write_i32(1) // block_count
            .write_string("popular")
            .write_string("Popular Rooms")
            .write_i32(1)
            .write_bool(false)
            .write_i32(0)
            .write_i32(1) // room_count
            .write_i32(123) // flat_id
            .write_string("Chill Zone")
            .write_i32(9)
            .write_string("Bob")
            .write_i32(0)
            .write_i32(5)
            .write_i32(25)
            .write_string("a nice room")
            .write_i32(0)
            .write_i32(10)
            .write_i32(1)
            .write_i32(2)
            .write_i32(0) // tag_count
            .write_i32(0); // bitmask, no conditional tail
        let body = out.finish();
        let rooms = parse_navigator_results(&body[6..]);

        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].flat_id, 123);
        assert_eq!(rooms[0].room_name, "Chill Zone");
        assert_eq!(rooms[0].user_count, 5);
        assert_eq!(rooms[0].max_user_count, 25);
    }

    #[test]
    fn parses_room_with_group_bitmask_tail() {
        let mut out = OutFrame::new(0);
        out.write_string("")
            .write_string("")
            .write_i32(1)
            .write_string("")
            .write_string("")
            .write_i32(0)
            .write_bool(false)
            .write_i32(0)
            .write_i32(1)
            .write_i32(1)
            .write_string("Group HQ")
            .write_i32(0)
            .write_string("Owner")
            .write_i32(0)
            .write_i32(1)
            .write_i32(25)
            .write_string("")
            .write_i32(0)
            .write_i32(0)
            .write_i32(0)
            .write_i32(0)
            .write_i32(0) // tag_count
            .write_i32(2) // bitmask: group data only
            .write_i32(55)
            .write_string("My Group")
            .write_string("badge01");
        let body = out.finish();
        let rooms = parse_navigator_results(&body[6..]);

        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_name, "Group HQ");
    }
}
