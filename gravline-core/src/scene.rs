//! Scene assembly
//!
//! World primitives are placed with a discrete planar [`Modifier`], their
//! vertices projected once through the camera, and every edge whose two
//! endpoints both project is appended to the frame's [`DrawList`]. An edge
//! with a failed endpoint is dropped whole.

use heapless::Vec;

use crate::camera::Camera;
use crate::draw_list::{color, DrawList};
use crate::fixed::Fixed;
use crate::level::{Cell, ColumnSource, ShapeId, LEVEL_HEIGHT};
use crate::math::{ScreenPoint, Vec3};

/// Most vertices any primitive has
pub const MAX_VERTICES: usize = 8;

/// World units per level cell
pub const CELL: i32 = 10;

/// Discrete planar transform applied about a local origin
///
/// Acts on the x/y plane; z is never touched. Rotations follow the usual
/// y-up orientation: `RotateLeft` is a quarter turn counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    #[default]
    Identity,
    RotateLeft,
    RotateRight,
    /// Half turn (both in-plane axes negated)
    Invert,
}

impl Modifier {
    /// Decode a 2-bit modifier id (upper bits ignored)
    pub const fn from_id(id: u8) -> Self {
        match id & 0x03 {
            0 => Self::Identity,
            1 => Self::RotateLeft,
            2 => Self::RotateRight,
            _ => Self::Invert,
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            Self::Identity => 0,
            Self::RotateLeft => 1,
            Self::RotateRight => 2,
            Self::Invert => 3,
        }
    }

    /// Transform `point` about `origin`
    pub fn apply(self, point: Vec3, origin: Vec3) -> Vec3 {
        let dx = point.x - origin.x;
        let dy = point.y - origin.y;
        let (nx, ny) = match self {
            Self::Identity => return point,
            Self::RotateLeft => (-dy, dx),
            Self::RotateRight => (dy, -dx),
            Self::Invert => (-dx, -dy),
        };
        Vec3::new(origin.x + nx, origin.y + ny, point.z)
    }
}

/// World-space wireframe primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Primitive {
    /// Axis-aligned box
    Box { center: Vec3, half: Vec3 },
    /// Rectangular base in the x/z plane, apex straight up
    Pyramid {
        base_center: Vec3,
        half_width: Fixed,
        half_depth: Fixed,
        height: Fixed,
    },
    /// Right triangle in x/y (right angle at -x,-y) extruded along z
    Prism { center: Vec3, half: Vec3 },
    /// Chevron pointing +x, flat in the x/y plane
    ShipMarker { center: Vec3, size: Fixed },
}

const BOX_EDGES: [(u8, u8); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

const PYRAMID_EDGES: [(u8, u8); 8] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (0, 4),
    (1, 4),
    (2, 4),
    (3, 4),
];

const PRISM_EDGES: [(u8, u8); 9] = [
    (0, 1),
    (1, 2),
    (2, 0),
    (3, 4),
    (4, 5),
    (5, 3),
    (0, 3),
    (1, 4),
    (2, 5),
];

const SHIP_EDGES: [(u8, u8); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];

impl Primitive {
    /// Vertices in local world space (before modifiers)
    pub fn vertices(&self) -> Vec<Vec3, MAX_VERTICES> {
        let mut out = Vec::new();
        match *self {
            Self::Box { center, half } => {
                // Bit 0 selects x, bit 1 y, bit 2 z
                for i in 0..8u8 {
                    let pick = |bit: u8, h: Fixed| if i & bit != 0 { h } else { -h };
                    let offset = Vec3::new(pick(1, half.x), pick(2, half.y), pick(4, half.z));
                    let _ = out.push(center + offset);
                }
            }
            Self::Pyramid {
                base_center: b,
                half_width: w,
                half_depth: d,
                height,
            } => {
                let _ = out.push(Vec3::new(b.x - w, b.y, b.z - d));
                let _ = out.push(Vec3::new(b.x + w, b.y, b.z - d));
                let _ = out.push(Vec3::new(b.x + w, b.y, b.z + d));
                let _ = out.push(Vec3::new(b.x - w, b.y, b.z + d));
                let _ = out.push(Vec3::new(b.x, b.y + height, b.z));
            }
            Self::Prism { center: c, half: h } => {
                for z in [c.z - h.z, c.z + h.z] {
                    let _ = out.push(Vec3::new(c.x - h.x, c.y - h.y, z));
                    let _ = out.push(Vec3::new(c.x + h.x, c.y - h.y, z));
                    let _ = out.push(Vec3::new(c.x - h.x, c.y + h.y, z));
                }
            }
            Self::ShipMarker { center: c, size } => {
                let half = size.div_int(2);
                let _ = out.push(Vec3::new(c.x + size, c.y, c.z));
                let _ = out.push(Vec3::new(c.x - size, c.y + half, c.z));
                let _ = out.push(Vec3::new(c.x - half, c.y, c.z));
                let _ = out.push(Vec3::new(c.x - size, c.y - half, c.z));
            }
        }
        out
    }

    /// Edges as vertex index pairs
    pub fn edges(&self) -> &'static [(u8, u8)] {
        match self {
            Self::Box { .. } => &BOX_EDGES,
            Self::Pyramid { .. } => &PYRAMID_EDGES,
            Self::Prism { .. } => &PRISM_EDGES,
            Self::ShipMarker { .. } => &SHIP_EDGES,
        }
    }
}

/// A primitive with its placement for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlacedPrimitive {
    pub primitive: Primitive,
    pub modifier: Modifier,
    /// Pivot for the modifier
    pub origin: Vec3,
    /// RGB565 color
    pub color: u16,
}

impl PlacedPrimitive {
    /// Unmodified primitive
    pub fn new(primitive: Primitive, color: u16) -> Self {
        Self {
            primitive,
            modifier: Modifier::Identity,
            origin: Vec3::ZERO,
            color,
        }
    }

    /// Apply `modifier` about `origin`
    pub fn with_modifier(mut self, modifier: Modifier, origin: Vec3) -> Self {
        self.modifier = modifier;
        self.origin = origin;
        self
    }
}

/// Per-frame assembly counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SceneStats {
    pub primitives: u32,
    /// Edges appended to the draw list
    pub edges_drawn: u32,
    /// Edges dropped because an endpoint failed to project
    pub edges_culled: u32,
    /// Edges rejected by a full draw list
    pub edges_dropped: u32,
}

/// Where the level is viewed from this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LevelView {
    /// World x of the left edge of the view
    pub scroll_x: Fixed,
    /// Ship x relative to the left edge of the view
    pub ship_x: Fixed,
    pub ship_y: Fixed,
    /// Columns walked per frame
    pub columns: u16,
}

/// Color used for each solid shape
pub const fn shape_color(shape: ShapeId) -> u16 {
    match shape {
        ShapeId::Square => color::CYAN,
        ShapeId::RightTri => color::GREEN,
        ShapeId::HalfSpike | ShapeId::FullSpike => color::RED,
        ShapeId::Empty | ShapeId::Reserved(_) => color::BLACK,
    }
}

pub const SHIP_COLOR: u16 = color::YELLOW;
pub const PORTAL_COLOR: u16 = color::MAGENTA;

/// Primitive for a level cell whose lower-left corner is `(x, y)`
///
/// Returns `None` for cells without geometry.
pub fn cell_primitive(cell: Cell, x: Fixed, y: Fixed) -> Option<PlacedPrimitive> {
    let half = Fixed::from_int(CELL / 2);
    let center = Vec3::new(x + half, y + half, Fixed::ZERO);
    let cube = Vec3::new(half, half, half);
    let primitive = match cell.shape {
        ShapeId::Square => Primitive::Box { center, half: cube },
        ShapeId::RightTri => Primitive::Prism { center, half: cube },
        ShapeId::HalfSpike | ShapeId::FullSpike => Primitive::Pyramid {
            base_center: Vec3::new(center.x, y, Fixed::ZERO),
            half_width: half,
            half_depth: half,
            height: if cell.shape == ShapeId::FullSpike {
                Fixed::from_int(CELL)
            } else {
                half
            },
        },
        ShapeId::Empty | ShapeId::Reserved(_) => return None,
    };
    Some(PlacedPrimitive::new(primitive, shape_color(cell.shape)).with_modifier(cell.modifier, center))
}

/// Appends projected primitives to a draw list
pub struct SceneBuilder<'a> {
    camera: &'a Camera,
    list: &'a mut DrawList,
    stats: SceneStats,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(camera: &'a Camera, list: &'a mut DrawList) -> Self {
        Self {
            camera,
            list,
            stats: SceneStats::default(),
        }
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    /// Project and append one primitive, returning the edges added
    pub fn add(&mut self, placed: &PlacedPrimitive) -> u32 {
        self.stats.primitives += 1;

        // Each vertex is projected once and shared by its edges
        let mut projected: [Option<ScreenPoint>; MAX_VERTICES] = [None; MAX_VERTICES];
        for (slot, vertex) in projected.iter_mut().zip(placed.primitive.vertices()) {
            *slot = self.camera.project(placed.modifier.apply(vertex, placed.origin));
        }

        let mut added = 0;
        for &(a, b) in placed.primitive.edges() {
            match (projected[a as usize], projected[b as usize]) {
                (Some(p0), Some(p1)) => {
                    if self.list.add_line(p0, p1, placed.color) {
                        added += 1;
                    } else {
                        self.stats.edges_dropped += 1;
                    }
                }
                _ => self.stats.edges_culled += 1,
            }
        }
        self.stats.edges_drawn += added;
        added
    }

    /// Walk the visible column window of a level and add its geometry
    ///
    /// Row 0 sits on the floor (`y = 0`). Columns the source cannot
    /// supply are skipped. Also adds the portal (when in view) and the
    /// ship marker. Returns the number of columns drawn.
    pub fn build_level<S: ColumnSource>(&mut self, source: &S, view: &LevelView) -> u16 {
        let header = *source.header();
        let first = column_at(view.scroll_x);
        let last = first.saturating_add(view.columns).min(source.width());

        let mut drawn = 0;
        for index in first..last {
            let Some(column) = source.column(index) else {
                continue;
            };
            let x = column_x(index, view.scroll_x);
            for row in 0..LEVEL_HEIGHT {
                let y = Fixed::from_int(row as i32 * CELL);
                if let Some(placed) = cell_primitive(column.cell(row), x, y) {
                    self.add(&placed);
                }
            }
            drawn += 1;
        }

        let portal = header.portal_column();
        if (first as i32..last as i32).contains(&portal) {
            let half = Fixed::from_int(CELL / 2);
            let center = Vec3::new(
                column_x(portal as u16, view.scroll_x) + half,
                Fixed::from_int(header.portal_y as i32 * CELL + CELL / 2),
                Fixed::ZERO,
            );
            let frame = Primitive::Box {
                center,
                half: Vec3::new(Fixed::from_int(2), Fixed::from_int(CELL), Fixed::from_int(2)),
            };
            self.add(&PlacedPrimitive::new(frame, PORTAL_COLOR));
        }

        let ship = Primitive::ShipMarker {
            center: Vec3::new(view.ship_x, view.ship_y, Fixed::ZERO),
            size: Fixed::from_int(4),
        };
        self.add(&PlacedPrimitive::new(ship, SHIP_COLOR));

        drawn
    }
}

/// First column at or left of the view's left edge
fn column_at(scroll_x: Fixed) -> u16 {
    if scroll_x.is_negative() {
        return 0;
    }
    (scroll_x.to_int() / CELL).clamp(0, u16::MAX as i32) as u16
}

/// View-relative x of a column's left edge
fn column_x(index: u16, scroll_x: Fixed) -> Fixed {
    let world = (index as i64 * CELL as i64) << Fixed::FRAC_BITS;
    let rel = world - scroll_x.raw() as i64;
    Fixed::from_raw(rel.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}
