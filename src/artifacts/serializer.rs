//! Plan <-> textual artifacts.
//!
//! A plan is rendered as one combined wall config shared by every node plus
//! one small descriptor per tile telling the node which role it plays.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::ini::{Document, Section};
use crate::errors::ParseError;
use crate::plan::{Plan, Tile, Wall, WallLayout, role_id};

/// Local file name of the combined wall config.
pub const WALL_CONFIG_FILE: &str = "piwall";
/// Local file name prefix of the per-tile descriptors (`pitile<n>`).
pub const DESCRIPTOR_PREFIX: &str = "pitile";
/// Section listing `pi<n>=<tile name>` for every tile.
pub const INDEX_SECTION: &str = "pimcplayer";
/// Remote name of the combined wall config, in the login user's home.
pub const REMOTE_WALL_CONFIG: &str = ".piwall";
/// Remote name of the tile descriptor, in the login user's home.
pub const REMOTE_DESCRIPTOR: &str = ".pitile";

/// Rendered artifacts for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub wall_config: String,
    /// `(sequence_id, descriptor text)` in sequence order
    pub descriptors: Vec<(u32, String)>,
}

pub fn descriptor_file_name(sequence_id: u32) -> String {
    format!("{}{}", DESCRIPTOR_PREFIX, sequence_id)
}

/// Whether `name` looks like a descriptor file (`pitile` followed by digits).
pub fn is_descriptor_file_name(name: &str) -> bool {
    name.strip_prefix(DESCRIPTOR_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

pub fn render_descriptor(sequence_id: u32) -> String {
    let mut doc = Document::new();
    doc.push(Section::new("tile").with("id", role_id(sequence_id)));
    doc.render()
}

pub fn serialize(plan: &Plan) -> Artifacts {
    let wall = plan.wall();
    let mut doc = Document::new();

    doc.push(
        Section::new(&wall.id)
            .with("x", wall.origin_x)
            .with("y", wall.origin_y)
            .with("width", wall.width)
            .with("height", wall.height)
            .with("bezel", wall.bezel_px),
    );

    for tile in plan.tiles() {
        doc.push(
            Section::new(&tile.name)
                .with("wall", &wall.id)
                .with("x", tile.x)
                .with("y", tile.y)
                .with("width", tile.width)
                .with("height", tile.height),
        );
    }

    let mut index = Section::new(INDEX_SECTION);
    for tile in plan.tiles() {
        index.push(tile.role_id(), &tile.name);
    }
    doc.push(index);

    Artifacts {
        wall_config: doc.render(),
        descriptors: plan
            .tiles()
            .iter()
            .map(|t| (t.sequence_id, render_descriptor(t.sequence_id)))
            .collect(),
    }
}

fn inconsistent(message: impl Into<String>) -> ParseError {
    ParseError::Inconsistent(message.into())
}

fn parse_role(key: &str) -> Option<u32> {
    key.strip_prefix("pi")?.parse().ok().filter(|id| *id > 0)
}

/// Parse a combined wall config back into its layout.
pub fn deserialize(wall_config: &str) -> Result<WallLayout, ParseError> {
    let doc = Document::parse(wall_config)?;
    let first = doc.sections().first().ok_or(ParseError::Empty)?;
    if first.name == INDEX_SECTION || first.get("wall").is_some() {
        return Err(inconsistent("first section is not a wall section"));
    }

    let wall = Wall {
        id: first.name.clone(),
        origin_x: first.require_u32("x")?,
        origin_y: first.require_u32("y")?,
        width: first.require_u32("width")?,
        height: first.require_u32("height")?,
        bezel_px: first.require_u32("bezel")?,
    };

    let index = doc
        .section(INDEX_SECTION)
        .ok_or_else(|| ParseError::MissingIndex(INDEX_SECTION.to_string()))?;

    let mut by_sequence: BTreeMap<u32, &str> = BTreeMap::new();
    for (key, name) in index.entries() {
        let sequence_id =
            parse_role(key).ok_or_else(|| inconsistent(format!("bad index key '{}'", key)))?;
        if by_sequence.insert(sequence_id, name).is_some() {
            return Err(inconsistent(format!("duplicate index key '{}'", key)));
        }
    }
    for (expected, actual) in (1u32..).zip(by_sequence.keys()) {
        if expected != *actual {
            return Err(inconsistent(format!(
                "index is not dense: expected {} but found {}",
                role_id(expected),
                role_id(*actual)
            )));
        }
    }

    let indexed: HashSet<&str> = by_sequence.values().copied().collect();
    if indexed.len() != by_sequence.len() {
        return Err(inconsistent("a tile is listed twice in the index"));
    }
    for section in doc.sections().iter().skip(1) {
        if section.name != INDEX_SECTION && !indexed.contains(section.name.as_str()) {
            return Err(inconsistent(format!(
                "tile section [{}] is not in the index",
                section.name
            )));
        }
    }

    let mut tiles = Vec::with_capacity(by_sequence.len());
    for (sequence_id, name) in by_sequence {
        let section = doc
            .section(name)
            .filter(|s| s.name != wall.id && s.name != INDEX_SECTION)
            .ok_or_else(|| {
                inconsistent(format!(
                    "index entry {} names unknown tile '{}'",
                    role_id(sequence_id),
                    name
                ))
            })?;
        let owner = section.require("wall")?;
        if owner != wall.id {
            return Err(inconsistent(format!(
                "tile [{}] belongs to wall '{}', expected '{}'",
                name, owner, wall.id
            )));
        }
        tiles.push(Tile {
            sequence_id,
            name: name.to_string(),
            row: 0,
            column: 0,
            x: section.require_u32("x")?,
            y: section.require_u32("y")?,
            width: section.require_u32("width")?,
            height: section.require_u32("height")?,
        });
    }

    assign_grid_cells(&mut tiles);
    Ok(WallLayout { wall, tiles })
}

/// Recover row/column from the distinct x and y offsets.
fn assign_grid_cells(tiles: &mut [Tile]) {
    let mut xs: Vec<u32> = tiles.iter().map(|t| t.x).collect();
    let mut ys: Vec<u32> = tiles.iter().map(|t| t.y).collect();
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();
    for tile in tiles {
        // Both offsets come from the vectors, so the search always hits.
        tile.column = xs.binary_search(&tile.x).unwrap_or_default() as u32;
        tile.row = ys.binary_search(&tile.y).unwrap_or_default() as u32;
    }
}

/// Write the artifacts into `config_dir`, replacing any previous plan's files.
pub fn write_artifacts(config_dir: &Path, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    for entry in fs::read_dir(config_dir)
        .with_context(|| format!("Failed to read {}", config_dir.display()))?
    {
        let entry = entry?;
        let stale = entry
            .file_name()
            .to_str()
            .is_some_and(is_descriptor_file_name);
        if stale && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
        }
    }

    let mut written = Vec::with_capacity(artifacts.descriptors.len() + 1);
    let wall_path = config_dir.join(WALL_CONFIG_FILE);
    fs::write(&wall_path, &artifacts.wall_config)
        .with_context(|| format!("Failed to write {}", wall_path.display()))?;
    written.push(wall_path);

    for (sequence_id, text) in &artifacts.descriptors {
        let path = config_dir.join(descriptor_file_name(*sequence_id));
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    tracing::info!(dir = %config_dir.display(), files = written.len(), "wrote artifacts");
    Ok(written)
}
