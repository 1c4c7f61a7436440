//! Toroidal grid arithmetic over the world map

use crate::types::Position;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building or reading a map
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("map has zero width or height")]
    EmptyGrid,
    #[error("map rows have unequal length")]
    RaggedRows,
    #[error("unknown terrain glyph {0:?}")]
    UnknownGlyph(char),
}

/// Terrain byte stored per cell in `MapConfig::terrain`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TerrainType {
    None = 0,
    TallGrass = 1,
    Boulder = 2,
}

impl TerrainType {
    /// Unknown bytes read as empty ground
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => TerrainType::TallGrass,
            2 => TerrainType::Boulder,
            _ => TerrainType::None,
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(TerrainType::None),
            'T' => Some(TerrainType::TallGrass),
            'O' => Some(TerrainType::Boulder),
            _ => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            TerrainType::None => "",
            TerrainType::TallGrass => "🌳",
            TerrainType::Boulder => "🪨",
        }
    }
}

/// Singleton world map: bounds for wrap-around plus a row-major terrain layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub terrain: Vec<u8>,
}

impl MapConfig {
    /// Empty map of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            terrain: vec![TerrainType::None as u8; (width as usize) * (height as usize)],
        }
    }

    /// Build a map from rows of glyphs (`.` ground, `T` tall grass, `O` boulder)
    pub fn parse_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        let mut terrain = Vec::with_capacity(width * height);
        for row in rows {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(GridError::RaggedRows);
            }
            for glyph in row.chars() {
                let cell = TerrainType::from_glyph(glyph).ok_or(GridError::UnknownGlyph(glyph))?;
                terrain.push(cell as u8);
            }
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            terrain,
        })
    }

    /// A map is usable once both dimensions are non-zero
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Wrap a cell onto the torus; result lies in `[0, width) x [0, height)`
    pub fn wrap(&self, x: i32, y: i32) -> Result<Position, GridError> {
        if !self.is_ready() {
            return Err(GridError::EmptyGrid);
        }
        Ok(Position {
            x: wrap_axis(x, self.width),
            y: wrap_axis(y, self.height),
        })
    }

    /// Terrain at a cell; coordinates are wrapped first
    pub fn terrain_at(&self, x: i32, y: i32) -> TerrainType {
        let Ok(pos) = self.wrap(x, y) else {
            return TerrainType::None;
        };
        let index = pos.y as usize * self.width as usize + pos.x as usize;
        self.terrain
            .get(index)
            .copied()
            .map(TerrainType::from_u8)
            .unwrap_or(TerrainType::None)
    }

    /// Every cell with non-empty terrain, for renderers
    pub fn terrain_cells(&self) -> Vec<(Position, TerrainType)> {
        if !self.is_ready() {
            return Vec::new();
        }
        let width = self.width as usize;
        self.terrain
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let pos = Position::new((index % width) as i32, (index / width) as i32);
                (pos, TerrainType::from_u8(*value))
            })
            .filter(|(_, terrain)| *terrain != TerrainType::None)
            .collect()
    }

    /// Shortest distance along each axis, going around the edges if shorter
    pub fn torus_delta(&self, a: Position, b: Position) -> Result<(u32, u32), GridError> {
        let a = self.wrap(a.x, a.y)?;
        let b = self.wrap(b.x, b.y)?;
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);
        Ok((dx.min(self.width - dx), dy.min(self.height - dy)))
    }

    /// Check if two cells are the same or orthogonal neighbours on the torus
    pub fn are_adjacent(&self, a: Position, b: Position) -> Result<bool, GridError> {
        let (dx, dy) = self.torus_delta(a, b)?;
        Ok(dx + dy <= 1)
    }
}

/// Floored modulo: always in `[0, size)` even for negative input
fn wrap_axis(value: i32, size: u32) -> i32 {
    (i64::from(value).rem_euclid(i64::from(size))) as i32
}
