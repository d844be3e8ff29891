//! Level file format
//!
//! A level is a 16-byte header followed by fixed-size column records:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "GVL1"
//!      4     1  version (1)
//!      5     2  width in columns (LE)
//!      7     1  height in rows (9)
//!      8     1  start x
//!      9     1  start y
//!     10     1  portal dx (i8, relative to the last column)
//!     11     1  portal y
//!     12     1  end-cap width
//!     13     3  reserved
//!     16   7*w  columns
//! ```
//!
//! Each column is a 56-bit little-endian word holding 9 cells of 6 bits,
//! row 0 in the lowest bits. A cell is a 4-bit shape id plus a 2-bit
//! modifier id. Decoding is pure; storage goes through [`ColumnSource`].

use crate::scene::Modifier;

/// Header size in bytes
pub const HEADER_LEN: usize = 16;

/// Column record size in bytes
pub const COLUMN_BYTES: usize = 7;

/// Rows per column
pub const LEVEL_HEIGHT: u8 = 9;

/// File magic
pub const MAGIC: [u8; 4] = *b"GVL1";

/// Supported format version
pub const VERSION: u8 = 1;

/// Level decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LevelError {
    /// Fewer bytes than a header (or a referenced column) requires
    TooShort,
    /// Magic is not "GVL1"
    BadMagic,
    /// Version byte is not 1
    UnsupportedVersion(u8),
    /// Height byte is not 9
    BadHeight(u8),
}

/// Cell shape vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShapeId {
    Empty,
    Square,
    RightTri,
    HalfSpike,
    FullSpike,
    /// Ids 5..=15, ignored by the scene builder
    Reserved(u8),
}

impl ShapeId {
    /// Decode a 4-bit shape id (upper bits ignored)
    pub const fn from_id(id: u8) -> Self {
        match id & 0x0F {
            0 => Self::Empty,
            1 => Self::Square,
            2 => Self::RightTri,
            3 => Self::HalfSpike,
            4 => Self::FullSpike,
            other => Self::Reserved(other),
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Square => 1,
            Self::RightTri => 2,
            Self::HalfSpike => 3,
            Self::FullSpike => 4,
            Self::Reserved(id) => id & 0x0F,
        }
    }

    /// Whether this cell produces geometry
    pub const fn is_solid(self) -> bool {
        !matches!(self, Self::Empty | Self::Reserved(_))
    }
}

/// One decoded cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cell {
    pub shape: ShapeId,
    pub modifier: Modifier,
}

impl Cell {
    pub const EMPTY: Self = Self {
        shape: ShapeId::Empty,
        modifier: Modifier::Identity,
    };

    /// Decode a packed 6-bit cell
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            shape: ShapeId::from_id(bits & 0x0F),
            modifier: Modifier::from_id((bits >> 4) & 0x03),
        }
    }

    /// Pack into 6 bits
    pub const fn to_bits(self) -> u8 {
        self.shape.id() | (self.modifier.id() << 4)
    }
}

/// A 56-bit column record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Column(u64);

impl Column {
    /// Decode from a 7-byte little-endian record
    pub const fn from_bytes(b: [u8; COLUMN_BYTES]) -> Self {
        let v = (b[0] as u64)
            | (b[1] as u64) << 8
            | (b[2] as u64) << 16
            | (b[3] as u64) << 24
            | (b[4] as u64) << 32
            | (b[5] as u64) << 40
            | (b[6] as u64) << 48;
        Self(v)
    }

    /// Encode nine cells (row 0 first) into a column record
    pub const fn encode(cells: [Cell; LEVEL_HEIGHT as usize]) -> [u8; COLUMN_BYTES] {
        let mut v = 0u64;
        let mut row = 0;
        while row < LEVEL_HEIGHT as usize {
            v |= ((cells[row].to_bits() & 0x3F) as u64) << (row * 6);
            row += 1;
        }
        let mut out = [0u8; COLUMN_BYTES];
        let mut i = 0;
        while i < COLUMN_BYTES {
            out[i] = (v >> (i * 8)) as u8;
            i += 1;
        }
        out
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Packed 6-bit cell for `row` (0..9); rows past the top read as empty
    pub const fn cell_bits(self, row: u8) -> u8 {
        if row >= LEVEL_HEIGHT {
            return 0;
        }
        ((self.0 >> (row as u32 * 6)) & 0x3F) as u8
    }

    pub const fn cell(self, row: u8) -> Cell {
        Cell::from_bits(self.cell_bits(row))
    }

    pub const fn is_empty(self) -> bool {
        self.0 & 0x003F_FFFF_FFFF_FFFF == 0
    }
}

/// Decoded level header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LevelHeader {
    pub width: u16,
    pub height: u8,
    pub start_x: u8,
    pub start_y: u8,
    /// Portal column relative to the last column
    pub portal_dx: i8,
    pub portal_y: u8,
    pub endcap_width: u8,
}

impl LevelHeader {
    /// Parse and validate the 16-byte header
    pub fn parse(bytes: &[u8]) -> Result<Self, LevelError> {
        let h = bytes.get(..HEADER_LEN).ok_or(LevelError::TooShort)?;
        if h[0..4] != MAGIC {
            return Err(LevelError::BadMagic);
        }
        if h[4] != VERSION {
            return Err(LevelError::UnsupportedVersion(h[4]));
        }
        if h[7] != LEVEL_HEIGHT {
            return Err(LevelError::BadHeight(h[7]));
        }
        Ok(Self {
            width: u16::from_le_bytes([h[5], h[6]]),
            height: h[7],
            start_x: h[8],
            start_y: h[9],
            portal_dx: h[10] as i8,
            portal_y: h[11],
            endcap_width: h[12],
        })
    }

    /// Encode back into the on-disk header layout
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let w = self.width.to_le_bytes();
        [
            MAGIC[0],
            MAGIC[1],
            MAGIC[2],
            MAGIC[3],
            VERSION,
            w[0],
            w[1],
            self.height,
            self.start_x,
            self.start_y,
            self.portal_dx as u8,
            self.portal_y,
            self.endcap_width,
            0,
            0,
            0,
        ]
    }

    /// Absolute portal column (`width - 1 + portal_dx`)
    pub const fn portal_column(&self) -> i32 {
        self.width as i32 - 1 + self.portal_dx as i32
    }

    /// Byte offset of column `index`
    pub const fn column_offset(index: u16) -> usize {
        HEADER_LEN + index as usize * COLUMN_BYTES
    }
}

/// Random access to level columns
///
/// Implemented over in-memory bytes here; flash or SD-backed sources
/// implement the same seam.
pub trait ColumnSource {
    /// Level header
    fn header(&self) -> &LevelHeader;

    /// Column at `index`, or `None` if it cannot be supplied
    fn column(&self, index: u16) -> Option<Column>;

    /// Number of columns
    fn width(&self) -> u16 {
        self.header().width
    }
}

/// A level held in a byte slice (compiled in or memory-mapped flash)
#[derive(Debug, Clone, Copy)]
pub struct SliceLevel<'a> {
    header: LevelHeader,
    bytes: &'a [u8],
}

impl<'a> SliceLevel<'a> {
    /// Validate the header and wrap the bytes
    ///
    /// Columns are not checked up front; a truncated body yields `None`
    /// for the missing columns.
    pub fn new(bytes: &'a [u8]) -> Result<Self, LevelError> {
        let header = LevelHeader::parse(bytes)?;
        Ok(Self { header, bytes })
    }

    /// Columns actually present in the byte slice
    pub fn available_columns(&self) -> u16 {
        let body = (self.bytes.len() - HEADER_LEN) / COLUMN_BYTES;
        body.min(self.header.width as usize) as u16
    }
}

impl ColumnSource for SliceLevel<'_> {
    fn header(&self) -> &LevelHeader {
        &self.header
    }

    fn column(&self, index: u16) -> Option<Column> {
        if index >= self.header.width {
            return None;
        }
        let start = LevelHeader::column_offset(index);
        let record = self.bytes.get(start..start + COLUMN_BYTES)?;
        let mut b = [0u8; COLUMN_BYTES];
        b.copy_from_slice(record);
        Some(Column::from_bytes(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u16) -> LevelHeader {
        LevelHeader {
            width,
            height: LEVEL_HEIGHT,
            start_x: 2,
            start_y: 4,
            portal_dx: -3,
            portal_y: 5,
            endcap_width: 6,
        }
    }

    fn level_bytes(columns: &[[u8; COLUMN_BYTES]]) -> std::vec::Vec<u8> {
        let mut bytes = header(columns.len() as u16).to_bytes().to_vec();
        for c in columns {
            bytes.extend_from_slice(c);
        }
        bytes
    }

    #[test]
    fn test_header_round_trip() {
        let h = header(120);
        let bytes = h.to_bytes();
        assert_eq!(&bytes[0..4], b"GVL1");
        assert_eq!(bytes[5], 120);
        assert_eq!(bytes[6], 0);
        assert_eq!(bytes[10], 0xFD);
        assert_eq!(LevelHeader::parse(&bytes), Ok(h));
    }

    #[test]
    fn test_header_rejects_bad_input() {
        let good = header(10).to_bytes();
        assert_eq!(LevelHeader::parse(&good[..15]), Err(LevelError::TooShort));

        let mut bad = good;
        bad[0] = b'X';
        assert_eq!(LevelHeader::parse(&bad), Err(LevelError::BadMagic));

        let mut bad = good;
        bad[4] = 2;
        assert_eq!(LevelHeader::parse(&bad), Err(LevelError::UnsupportedVersion(2)));

        let mut bad = good;
        bad[7] = 8;
        assert_eq!(LevelHeader::parse(&bad), Err(LevelError::BadHeight(8)));
    }

    #[test]
    fn test_portal_column() {
        assert_eq!(header(100).portal_column(), 96);
    }

    #[test]
    fn test_cell_packing() {
        let cell = Cell {
            shape: ShapeId::HalfSpike,
            modifier: Modifier::Invert,
        };
        assert_eq!(cell.to_bits(), 0b11_0011);
        assert_eq!(Cell::from_bits(0b11_0011), cell);

        // Reserved shapes survive decoding but are not solid
        let reserved = Cell::from_bits(0x0B);
        assert_eq!(reserved.shape, ShapeId::Reserved(11));
        assert!(!reserved.shape.is_solid());
    }

    #[test]
    fn test_column_layout() {
        // Square at row 0, right-tri rotated left at row 8
        let mut cells = [Cell::EMPTY; LEVEL_HEIGHT as usize];
        cells[0] = Cell {
            shape: ShapeId::Square,
            modifier: Modifier::Identity,
        };
        cells[8] = Cell {
            shape: ShapeId::RightTri,
            modifier: Modifier::RotateLeft,
        };
        let bytes = Column::encode(cells);
        assert_eq!(bytes[0], 0x01);
        // Row 8 occupies bits 48..54: 0b01_0010 in the last byte
        assert_eq!(bytes[6], 0x12);

        let column = Column::from_bytes(bytes);
        for row in 0..LEVEL_HEIGHT {
            assert_eq!(column.cell(row), cells[row as usize]);
        }
        assert_eq!(column.cell(9), Cell::EMPTY);
        assert!(!column.is_empty());
        assert!(Column::from_bytes([0; COLUMN_BYTES]).is_empty());
    }

    #[test]
    fn test_slice_level_columns() {
        let mut cells = [Cell::EMPTY; LEVEL_HEIGHT as usize];
        cells[3] = Cell {
            shape: ShapeId::FullSpike,
            modifier: Modifier::RotateRight,
        };
        let col1 = Column::encode(cells);
        let bytes = level_bytes(&[[0; COLUMN_BYTES], col1]);

        let level = SliceLevel::new(&bytes).unwrap();
        assert_eq!(level.width(), 2);
        assert_eq!(level.column(0), Some(Column::default()));
        assert_eq!(level.column(1).map(|c| c.cell(3)), Some(cells[3]));
        assert_eq!(level.column(2), None);
    }

    #[test]
    fn test_truncated_body_skips_missing_columns() {
        let mut bytes = level_bytes(&[[0x01; COLUMN_BYTES], [0x01; COLUMN_BYTES]]);
        bytes.truncate(HEADER_LEN + COLUMN_BYTES + 3);

        let level = SliceLevel::new(&bytes).unwrap();
        assert_eq!(level.available_columns(), 1);
        assert!(level.column(0).is_some());
        assert_eq!(level.column(1), None);
    }
}
