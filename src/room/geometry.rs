// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Room geometry built from two cooperating frames: the floor-height-map
//! (a textual grid giving walls and dimensions) and the height-map (a
//! packed bitmask grid giving furniture collision and exact heights). The
//! height-map carries no dimensions of its own — it relies on the
//! floor-height-map having run first, so callers must buffer it if it
//! arrives out of order (see `session::connection`).

use crate::codec::frame::InFrame;

const STACKING_BLOCKED_MASK: i16 = 1 << 14;
const ROOM_TILE_MASK: i16 = 1 << 9;
const HEIGHT_MASK: i16 = 0x3FFF;

#[derive(Debug, Clone, Default)]
pub struct RoomGeometry {
    pub width: usize,
    pub height: usize,
    pub floor_map: Vec<Vec<char>>,
    pub tile_heights: Vec<Vec<f32>>,
    pub stacking_blocked: Vec<Vec<bool>>,
    pub is_room_tile: Vec<Vec<bool>>,
    pub door_x: i32,
    pub door_y: i32,
}

impl RoomGeometry {
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Parses the floor-height-map frame body: `{bool}{i32}{string}`, the
    /// string being rows separated by carriage returns. Rows shorter than
    /// the first row are padded with `'x'` so every `[y][x]` access is
    /// always in range for the configured `width`.
    pub fn from_floor_height_map(body: &[u8]) -> Self {
        let mut buf = InFrame::new(body);
        let _use_legacy_parser = buf.read_bool();
        let _wall_height = buf.read_i32();
        let map_text = buf.read_string();

        let rows: Vec<&str> = map_text.trim().split('\r').collect();
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);

        let floor_map: Vec<Vec<char>> = rows
            .iter()
            .map(|row| {
                let mut chars: Vec<char> = row.chars().collect();
                chars.resize(width, 'x');
                chars
            })
            .collect();

        let mut geometry = RoomGeometry {
            width,
            height,
            floor_map,
            tile_heights: vec![vec![0.0; width]; height],
            stacking_blocked: vec![vec![false; width]; height],
            is_room_tile: vec![vec![false; width]; height],
            door_x: -1,
            door_y: -1,
        };
        geometry.find_door();
        geometry
    }

    fn tile(&self, x: i32, y: i32) -> Option<char> {
        if x < 0 || y < 0 {
            return None;
        }
        self.floor_map.get(y as usize).and_then(|row| row.get(x as usize)).copied()
    }

    fn find_door(&mut self) {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let Some(here) = self.tile(x, y) else { continue };
                if here.eq_ignore_ascii_case(&'x') {
                    continue;
                }

                let north = self.tile(x, y - 1);
                let west = self.tile(x - 1, y);
                let south = self.tile(x, y + 1);
                let east = self.tile(x + 1, y);

                let is_x = |c: Option<char>| c.is_some_and(|c| c.eq_ignore_ascii_case(&'x'));

                if is_x(north) && is_x(west) && is_x(south) {
                    self.door_x = x;
                    self.door_y = y;
                    return;
                }
                if is_x(north) && is_x(west) && is_x(east) {
                    self.door_x = x;
                    self.door_y = y;
                    return;
                }
            }
        }
    }

    /// Applies the height-map frame: `width*height` big-endian `i16`
    /// pairs. Clamps to the expected size if the payload is short or long
    /// rather than failing.
    pub fn apply_height_map(&mut self, body: &[u8]) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let expected = self.width * self.height * 2;
        let data = &body[..body.len().min(expected)];

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = (y * self.width + x) * 2;
                if idx + 2 > data.len() {
                    return;
                }
                let value = i16::from_be_bytes([data[idx], data[idx + 1]]);
                self.stacking_blocked[y][x] = (value & STACKING_BLOCKED_MASK) != 0;
                self.is_room_tile[y][x] = (value & ROOM_TILE_MASK) == 0;
                self.tile_heights[y][x] = f32::from(value & HEIGHT_MASK) / 256.0;
            }
        }
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        !self.floor_map[y][x].eq_ignore_ascii_case(&'x') && !self.stacking_blocked[y][x]
    }

    pub fn walkable_tiles(&self) -> Vec<(i32, i32)> {
        let mut tiles = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.is_walkable(x, y) {
                    tiles.push((x, y));
                }
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame::OutFrame;

    fn floor_height_map_body(map_text: &str) -> Vec<u8> {
        let mut out = OutFrame::new(0);
        out.write_bool(false).write_i32(0).write_string(map_text);
        out.finish()[6..].to_vec()
    }

    #[test]
    fn door_faces_east_when_surrounded_on_three_sides() {
        let body = floor_height_map_body("xxx\rx0x\rxxx");
        let geometry = RoomGeometry::from_floor_height_map(&body);
        assert_eq!(geometry.width, 3);
        assert_eq!(geometry.height, 3);
        assert_eq!((geometry.door_x, geometry.door_y), (1, 1));
    }

    #[test]
    fn door_faces_south_when_only_two_rows_present() {
        let body = floor_height_map_body("xxxx\rxx0x");
        let geometry = RoomGeometry::from_floor_height_map(&body);
        assert_eq!((geometry.door_x, geometry.door_y), (2, 1));
    }

    #[test]
    fn no_door_found_leaves_sentinel_coordinates() {
        let body = floor_height_map_body("000\r000\r000");
        let geometry = RoomGeometry::from_floor_height_map(&body);
        assert_eq!((geometry.door_x, geometry.door_y), (-1, -1));
    }

    #[test]
    fn height_map_sets_blocking_and_height_bits() {
        let body = floor_height_map_body("00\r00");
        let mut geometry = RoomGeometry::from_floor_height_map(&body);

        // tile (0,0): stacking blocked, height 2.0 -> raw = 0x4000 | (2*256)
        let t00: i16 = (STACKING_BLOCKED_MASK) | (2 * 256);
        // tile (1,0): room tile bit set (inverted sense -> is_room_tile false), height 0
        let t10: i16 = ROOM_TILE_MASK;
        let mut raw = Vec::new();
        raw.extend_from_slice(&t00.to_be_bytes());
        raw.extend_from_slice(&t10.to_be_bytes());
        raw.extend_from_slice(&0i16.to_be_bytes());
        raw.extend_from_slice(&0i16.to_be_bytes());

        geometry.apply_height_map(&raw);
        assert!(geometry.stacking_blocked[0][0]);
        assert_eq!(geometry.tile_heights[0][0], 2.0);
        assert!(!geometry.is_room_tile[0][1]);
        assert!(!geometry.is_walkable(0, 0)); // blocked despite being a floor tile
    }

    #[test]
    fn walkable_tiles_excludes_walls_and_blocked() {
        let body = floor_height_map_body("x0\r00");
        let mut geometry = RoomGeometry::from_floor_height_map(&body);
        let raw = vec![0u8; geometry.width * geometry.height * 2];
        geometry.apply_height_map(&raw);

        let tiles = geometry.walkable_tiles();
        assert!(tiles.contains(&(1, 0)));
        assert!(!tiles.contains(&(0, 0))); // wall
    }

    #[test]
    fn short_height_map_payload_is_clamped_not_rejected() {
        let body = floor_height_map_body("00\r00");
        let mut geometry = RoomGeometry::from_floor_height_map(&body);
        geometry.apply_height_map(&[0x00]); // far too short
        assert!(!geometry.stacking_blocked[0][0]);
    }
}
