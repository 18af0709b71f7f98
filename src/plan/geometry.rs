//! Bezel-compensated tile geometry.
//!
//! The wall is a uniform `columns × rows` grid of identical monitors. The
//! physical bezel is converted into on-screen pixels using the monitor's own
//! px/mm ratio and compensated at the wall's outer boundary only:
//!
//! ```text
//! bezel_px    = round(monitor_width_px / monitor_inside_width_mm * bezel_mm)
//! wall.width  = monitor_width_px  * columns + 2 * bezel_px
//! wall.height = monitor_height_px * rows    + 2 * bezel_px
//! tile.x      = column * monitor_width_px  + (column > 0 ? 2 * bezel_px : 0)
//! tile.y      = row    * monitor_height_px + (row    > 0 ? 2 * bezel_px : 0)
//! ```
//!
//! Rounding is half away from zero (`f64::round`), so 2.5 becomes 3. Every
//! tile is a full `monitor_width_px × monitor_height_px` rectangle and tiles
//! are numbered row-major starting at 1.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::names::NameSource;
use crate::errors::ValidationError;

/// Largest wall, in tiles, that a plan may describe.
pub const MAX_TILES: u32 = 1024;

static ARRANGEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+)\s*x\s*(\d+)\s*$").expect("valid regex"));

/// Grid shape of the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrangement {
    pub columns: u32,
    pub rows: u32,
}

impl Arrangement {
    /// Number of tiles, or `None` when it does not fit in a `u32`.
    pub fn tile_count(&self) -> Option<u32> {
        self.columns.checked_mul(self.rows)
    }
}

impl std::fmt::Display for Arrangement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

impl std::str::FromStr for Arrangement {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ARRANGEMENT_RE.captures(s).ok_or_else(|| {
            ValidationError::new("arrangement", format!("'{}' is not of the form 2x2", s.trim()))
        })?;
        let parse = |idx: usize, field: &'static str| -> Result<u32, ValidationError> {
            let value: u32 = caps[idx]
                .parse()
                .map_err(|_| ValidationError::new(field, "number is too large"))?;
            if value == 0 {
                return Err(ValidationError::new(field, "must be greater than 0"));
            }
            Ok(value)
        };
        Ok(Self {
            columns: parse(1, "columns")?,
            rows: parse(2, "rows")?,
        })
    }
}

/// Physical description of the wall as captured from the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSpec {
    pub columns: u32,
    pub rows: u32,
    pub monitor_width_px: u32,
    pub monitor_height_px: u32,
    /// Width of the visible area of one monitor, in millimeters
    pub monitor_inside_width_mm: f64,
    /// Width of one monitor's bezel, in millimeters
    pub bezel_mm: f64,
}

impl WallSpec {
    pub fn arrangement(&self) -> Arrangement {
        Arrangement {
            columns: self.columns,
            rows: self.rows,
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.columns == 0 {
            return Err(ValidationError::new("columns", "must be greater than 0"));
        }
        if self.rows == 0 {
            return Err(ValidationError::new("rows", "must be greater than 0"));
        }
        match self.arrangement().tile_count() {
            Some(count) if count <= MAX_TILES => {}
            _ => {
                return Err(ValidationError::new(
                    "arrangement",
                    format!("at most {} tiles are supported", MAX_TILES),
                ));
            }
        }
        if self.monitor_width_px == 0 {
            return Err(ValidationError::new(
                "monitor width",
                "must be greater than 0",
            ));
        }
        if self.monitor_height_px == 0 {
            return Err(ValidationError::new(
                "monitor height",
                "must be greater than 0",
            ));
        }
        if !self.monitor_inside_width_mm.is_finite() || self.monitor_inside_width_mm <= 0.0 {
            return Err(ValidationError::new(
                "monitor inside width",
                "must be a positive number of millimeters",
            ));
        }
        if !self.bezel_mm.is_finite() || self.bezel_mm < 0.0 {
            return Err(ValidationError::new(
                "bezel width",
                "must be zero or a positive number of millimeters",
            ));
        }
        Ok(())
    }

    /// Bezel width expressed in on-screen pixels.
    pub fn bezel_px(&self) -> Result<u32, ValidationError> {
        let px = (self.monitor_width_px as f64 / self.monitor_inside_width_mm * self.bezel_mm).round();
        if px > u32::MAX as f64 {
            return Err(ValidationError::new("bezel width", "too large for pixel space"));
        }
        Ok(px as u32)
    }
}

/// The bounding rectangle of the assembled wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub id: String,
    pub origin_x: u32,
    pub origin_y: u32,
    pub width: u32,
    pub height: u32,
    pub bezel_px: u32,
}

/// One monitor's rectangle within the wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// 1-based position in row-major order
    pub sequence_id: u32,
    pub name: String,
    pub row: u32,
    pub column: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// Identifier the node uses to find itself in the wall config.
    pub fn role_id(&self) -> String {
        role_id(self.sequence_id)
    }
}

/// `pi<sequence_id>`, the key a node looks up in the wall config index.
pub fn role_id(sequence_id: u32) -> String {
    format!("pi{}", sequence_id)
}

/// Wall plus tiles: exactly what the combined wall config describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallLayout {
    pub wall: Wall,
    pub tiles: Vec<Tile>,
}

/// A complete, deployable description of a wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub spec: WallSpec,
    pub layout: WallLayout,
}

impl Plan {
    pub fn wall(&self) -> &Wall {
        &self.layout.wall
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.layout.tiles
    }

    /// Check the structural invariants of a plan that was not produced by
    /// [`compute_plan`] in this process (e.g. loaded from disk).
    pub fn check_invariants(&self) -> Result<(), String> {
        self.spec.validate().map_err(|e| e.to_string())?;
        let expected = self.spec.columns as usize * self.spec.rows as usize;
        if self.tiles().len() != expected {
            return Err(format!(
                "expected {} tiles for a {} wall, found {}",
                expected,
                self.spec.arrangement(),
                self.tiles().len()
            ));
        }
        let mut names = std::collections::HashSet::new();
        names.insert(self.wall().id.as_str());
        for (idx, tile) in self.tiles().iter().enumerate() {
            if tile.sequence_id as usize != idx + 1 {
                return Err(format!(
                    "tile at position {} has sequence id {}",
                    idx + 1,
                    tile.sequence_id
                ));
            }
            if !names.insert(tile.name.as_str()) {
                return Err(format!("name '{}' is used twice", tile.name));
            }
        }
        let bezel_px = self.spec.bezel_px().map_err(|e| e.to_string())?;
        let (width, height) = wall_size(&self.spec, bezel_px).map_err(|e| e.to_string())?;
        let wall = self.wall();
        if wall.bezel_px != bezel_px || wall.width != width || wall.height != height {
            return Err(format!(
                "wall {}x{} (bezel {}) does not match its spec ({}x{}, bezel {})",
                wall.width, wall.height, wall.bezel_px, width, height, bezel_px
            ));
        }
        Ok(())
    }
}

fn overflow(field: &'static str) -> ValidationError {
    ValidationError::new(field, "wall is too large for pixel space")
}

fn wall_size(spec: &WallSpec, bezel_px: u32) -> Result<(u32, u32), ValidationError> {
    let border = bezel_px.checked_mul(2).ok_or_else(|| overflow("bezel width"))?;
    let width = spec
        .monitor_width_px
        .checked_mul(spec.columns)
        .and_then(|w| w.checked_add(border))
        .ok_or_else(|| overflow("columns"))?;
    let height = spec
        .monitor_height_px
        .checked_mul(spec.rows)
        .and_then(|h| h.checked_add(border))
        .ok_or_else(|| overflow("rows"))?;
    Ok((width, height))
}

/// Offset of the tile at `index` along one axis.
fn tile_offset(index: u32, monitor_px: u32, bezel_px: u32) -> u32 {
    // Bounded by the wall size, which has already been checked for overflow.
    index * monitor_px + if index > 0 { 2 * bezel_px } else { 0 }
}

/// Compute the wall and tile geometry for `spec`.
///
/// The wall id is drawn from `names` first, then one name per tile in
/// sequence order. Nothing is drawn when validation fails.
pub fn compute_plan(spec: &WallSpec, names: &mut dyn NameSource) -> Result<Plan, ValidationError> {
    spec.validate()?;
    let bezel_px = spec.bezel_px()?;
    let (width, height) = wall_size(spec, bezel_px)?;
    let tile_count = spec
        .arrangement()
        .tile_count()
        .ok_or_else(|| overflow("arrangement"))?;

    let wall = Wall {
        id: names.next_name(),
        origin_x: 0,
        origin_y: 0,
        width,
        height,
        bezel_px,
    };

    let mut tiles = Vec::with_capacity(tile_count as usize);
    let mut sequence_id = 1;
    for row in 0..spec.rows {
        let y = tile_offset(row, spec.monitor_height_px, bezel_px);
        for column in 0..spec.columns {
            tiles.push(Tile {
                sequence_id,
                name: names.next_name(),
                row,
                column,
                x: tile_offset(column, spec.monitor_width_px, bezel_px),
                y,
                width: spec.monitor_width_px,
                height: spec.monitor_height_px,
            });
            sequence_id += 1;
        }
    }

    tracing::debug!(
        wall = %wall.id,
        width = wall.width,
        height = wall.height,
        bezel_px,
        tiles = tiles.len(),
        "computed wall plan"
    );

    Ok(Plan {
        spec: spec.clone(),
        layout: WallLayout { wall, tiles },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::names::RandomNames;
    use std::collections::HashSet;

    struct CountingNames(u32);

    impl NameSource for CountingNames {
        fn next_name(&mut self) -> String {
            self.0 += 1;
            format!("name{:04}", self.0)
        }
    }

    fn spec(columns: u32, rows: u32) -> WallSpec {
        WallSpec {
            columns,
            rows,
            monitor_width_px: 1920,
            monitor_height_px: 1080,
            monitor_inside_width_mm: 520.0,
            bezel_mm: 10.0,
        }
    }

    #[test]
    fn test_two_by_two_reference_wall() {
        let plan = compute_plan(&spec(2, 2), &mut CountingNames(0)).unwrap();

        assert_eq!(plan.wall().bezel_px, 37);
        assert_eq!(plan.wall().width, 3914);
        assert_eq!(plan.wall().height, 2234);
        assert_eq!((plan.wall().origin_x, plan.wall().origin_y), (0, 0));

        let offsets: Vec<(u32, u32)> = plan.tiles().iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(offsets, vec![(0, 0), (1994, 0), (0, 1154), (1994, 1154)]);
        for tile in plan.tiles() {
            assert_eq!((tile.width, tile.height), (1920, 1080));
        }
    }

    #[test]
    fn test_last_tile_ends_at_wall_edge() {
        let plan = compute_plan(&spec(4, 3), &mut CountingNames(0)).unwrap();
        let last = plan.tiles().last().unwrap();
        assert_eq!(last.x + last.width, plan.wall().width);
        assert_eq!(last.y + last.height, plan.wall().height);
    }

    #[test]
    fn test_tiles_are_row_major_with_dense_sequence_ids() {
        let plan = compute_plan(&spec(3, 2), &mut CountingNames(0)).unwrap();
        assert_eq!(plan.tiles().len(), 6);
        for (idx, tile) in plan.tiles().iter().enumerate() {
            assert_eq!(tile.sequence_id, idx as u32 + 1);
            assert_eq!(tile.row, idx as u32 / 3);
            assert_eq!(tile.column, idx as u32 % 3);
        }
        // Column drives x, row drives y
        assert_eq!(plan.tiles()[1].y, 0);
        assert_eq!(plan.tiles()[3].x, 0);
    }

    #[test]
    fn test_tile_count_and_uniqueness_over_many_shapes() {
        let mut names = RandomNames::seeded(1);
        for columns in 1..=5 {
            for rows in 1..=5 {
                let plan = compute_plan(&spec(columns, rows), &mut names).unwrap();
                assert_eq!(plan.tiles().len(), (columns * rows) as usize);
                let ids: HashSet<u32> = plan.tiles().iter().map(|t| t.sequence_id).collect();
                let tile_names: HashSet<&str> =
                    plan.tiles().iter().map(|t| t.name.as_str()).collect();
                assert_eq!(ids.len(), plan.tiles().len());
                assert_eq!(tile_names.len(), plan.tiles().len());
                assert!(plan.check_invariants().is_ok());
            }
        }
    }

    #[test]
    fn test_bezel_rounds_half_away_from_zero() {
        let spec = WallSpec {
            columns: 1,
            rows: 1,
            monitor_width_px: 100,
            monitor_height_px: 100,
            monitor_inside_width_mm: 40.0,
            bezel_mm: 1.0,
        };
        // 100 / 40 * 1 = 2.5
        assert_eq!(spec.bezel_px().unwrap(), 3);
    }

    #[test]
    fn test_zero_bezel_packs_tiles_edge_to_edge() {
        let mut s = spec(2, 1);
        s.bezel_mm = 0.0;
        let plan = compute_plan(&s, &mut CountingNames(0)).unwrap();
        assert_eq!(plan.wall().bezel_px, 0);
        assert_eq!(plan.wall().width, 3840);
        assert_eq!(plan.tiles()[1].x, 1920);
    }

    #[test]
    fn test_wall_id_is_drawn_before_tiles() {
        let plan = compute_plan(&spec(1, 2), &mut CountingNames(0)).unwrap();
        assert_eq!(plan.wall().id, "name0001");
        assert_eq!(plan.tiles()[0].name, "name0002");
        assert_eq!(plan.tiles()[1].name, "name0003");
    }

    #[test]
    fn test_invalid_specs_are_rejected_without_consuming_names() {
        let cases: Vec<(WallSpec, &str)> = vec![
            (WallSpec { columns: 0, ..spec(2, 2) }, "columns"),
            (WallSpec { rows: 0, ..spec(2, 2) }, "rows"),
            (WallSpec { monitor_width_px: 0, ..spec(2, 2) }, "monitor width"),
            (WallSpec { monitor_height_px: 0, ..spec(2, 2) }, "monitor height"),
            (
                WallSpec { monitor_inside_width_mm: 0.0, ..spec(2, 2) },
                "monitor inside width",
            ),
            (WallSpec { bezel_mm: -1.0, ..spec(2, 2) }, "bezel width"),
            (WallSpec { bezel_mm: f64::NAN, ..spec(2, 2) }, "bezel width"),
        ];
        for (bad, field) in cases {
            let mut names = CountingNames(0);
            let err = compute_plan(&bad, &mut names).unwrap_err();
            assert_eq!(err.field, field);
            assert_eq!(names.0, 0);
        }
    }

    #[test]
    fn test_overflowing_wall_is_rejected() {
        let s = WallSpec {
            columns: u32::MAX,
            ..spec(1, 1)
        };
        assert!(compute_plan(&s, &mut CountingNames(0)).is_err());

        let s = WallSpec {
            monitor_width_px: u32::MAX,
            ..spec(2, 1)
        };
        assert_eq!(compute_plan(&s, &mut CountingNames(0)).unwrap_err().field, "columns");
    }

    #[test]
    fn test_tile_limit_rejected_before_allocating() {
        let mut names = CountingNames(0);
        let err = compute_plan(&spec(100_000, 40_000), &mut names).unwrap_err();
        assert_eq!(err.field, "arrangement");
        assert!(err.to_string().contains("1024"));
        assert_eq!(names.0, 0);

        // Product overflows u32 entirely
        let err = compute_plan(&spec(u32::MAX, 2), &mut names).unwrap_err();
        assert_eq!(err.field, "arrangement");

        assert_eq!(compute_plan(&spec(1025, 1), &mut names).unwrap_err().field, "arrangement");
        let plan = compute_plan(&spec(32, 32), &mut names).unwrap();
        assert_eq!(plan.tiles().len(), MAX_TILES as usize);
    }

    #[test]
    fn test_parse_arrangement() {
        let a: Arrangement = "2x3".parse().unwrap();
        assert_eq!((a.columns, a.rows), (2, 3));
        let a: Arrangement = " 4 X 1 ".parse().unwrap();
        assert_eq!((a.columns, a.rows), (4, 1));
        assert_eq!(a.to_string(), "4x1");
        assert_eq!(a.tile_count(), Some(4));
        let huge = Arrangement {
            columns: u32::MAX,
            rows: 2,
        };
        assert_eq!(huge.tile_count(), None);
    }

    #[test]
    fn test_parse_arrangement_rejects_garbage() {
        assert!("2".parse::<Arrangement>().is_err());
        assert!("x2".parse::<Arrangement>().is_err());
        assert!("2x".parse::<Arrangement>().is_err());
        assert!("axb".parse::<Arrangement>().is_err());
        assert!("-1x2".parse::<Arrangement>().is_err());
        assert_eq!("0x2".parse::<Arrangement>().unwrap_err().field, "columns");
        assert_eq!("2x0".parse::<Arrangement>().unwrap_err().field, "rows");
    }

    #[test]
    fn test_check_invariants_detects_tampering() {
        let mut plan = compute_plan(&spec(2, 1), &mut CountingNames(0)).unwrap();
        plan.layout.tiles[1].sequence_id = 5;
        assert!(plan.check_invariants().is_err());

        let mut plan = compute_plan(&spec(2, 1), &mut CountingNames(0)).unwrap();
        plan.layout.wall.width += 1;
        assert!(plan.check_invariants().is_err());

        let mut plan = compute_plan(&spec(2, 1), &mut CountingNames(0)).unwrap();
        plan.layout.tiles[1].name = plan.layout.tiles[0].name.clone();
        assert!(plan.check_invariants().is_err());
    }

    #[test]
    fn test_role_id() {
        let plan = compute_plan(&spec(1, 1), &mut CountingNames(0)).unwrap();
        assert_eq!(plan.tiles()[0].role_id(), "pi1");
    }
}
