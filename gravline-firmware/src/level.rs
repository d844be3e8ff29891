//! Compiled-in demo level
//!
//! A floor running the whole width with a repeating run of obstacles,
//! encoded at compile time in the on-disk level format.

use gravline_core::level::{
    Cell, Column, LevelHeader, ShapeId, COLUMN_BYTES, HEADER_LEN, LEVEL_HEIGHT,
};
use gravline_core::scene::Modifier;

/// Columns in the demo level
pub const WIDTH: u16 = 64;

const LEN: usize = HEADER_LEN + WIDTH as usize * COLUMN_BYTES;

const HEADER: LevelHeader = LevelHeader {
    width: WIDTH,
    height: LEVEL_HEIGHT,
    start_x: 2,
    start_y: 1,
    portal_dx: -4,
    portal_y: 2,
    endcap_width: 4,
};

/// Encoded level bytes
pub static DEMO_LEVEL: [u8; LEN] = encode();

const fn cell(shape: ShapeId, modifier: Modifier) -> Cell {
    Cell { shape, modifier }
}

/// Cells of column `c`, row 0 at the bottom
const fn column(c: usize) -> [Cell; LEVEL_HEIGHT as usize] {
    let mut cells = [Cell::EMPTY; LEVEL_HEIGHT as usize];
    cells[0] = cell(ShapeId::Square, Modifier::Identity);

    // Keep the start and the end cap clear
    if c < 6 || c + HEADER.endcap_width as usize >= WIDTH as usize {
        return cells;
    }
    match c % 12 {
        2 => cells[1] = cell(ShapeId::HalfSpike, Modifier::Identity),
        4 => cells[1] = cell(ShapeId::FullSpike, Modifier::Identity),
        6 => {
            cells[1] = cell(ShapeId::RightTri, Modifier::Identity);
            cells[2] = cell(ShapeId::Square, Modifier::Identity);
        }
        7 => {
            cells[1] = cell(ShapeId::Square, Modifier::Identity);
            cells[2] = cell(ShapeId::RightTri, Modifier::RotateLeft);
        }
        9 => {
            cells[8] = cell(ShapeId::Square, Modifier::Identity);
            cells[7] = cell(ShapeId::FullSpike, Modifier::Invert);
        }
        10 => cells[8] = cell(ShapeId::RightTri, Modifier::RotateRight),
        _ => {}
    }
    cells
}

const fn encode() -> [u8; LEN] {
    let mut out = [0u8; LEN];

    let header = HEADER.to_bytes();
    let mut i = 0;
    while i < HEADER_LEN {
        out[i] = header[i];
        i += 1;
    }

    let mut c = 0;
    while c < WIDTH as usize {
        let bytes = Column::encode(column(c));
        let base = LevelHeader::column_offset(c as u16);
        let mut b = 0;
        while b < COLUMN_BYTES {
            out[base + b] = bytes[b];
            b += 1;
        }
        c += 1;
    }
    out
}
