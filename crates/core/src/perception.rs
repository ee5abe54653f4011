//! Perception windows and hostile zone shapes.
//! This module exists so the agent's sight and the observers' watch share one geometry.
//! It does not own what is known about any cell.

use serde::{Deserialize, Serialize};

use crate::types::{ObserverKind, Pos};

/// A neighbourhood around a centre cell. Every shape is point-symmetric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ZoneShape {
    VonNeumann { radius: u8 },
    Moore { radius: u8 },
    /// Moore radius 1 plus the four cells two steps away along the axes.
    MooreWithEars,
}

impl ZoneShape {
    pub fn contains(self, dx: i32, dy: i32) -> bool {
        match self {
            ZoneShape::VonNeumann { radius } => dx.abs() + dy.abs() <= i32::from(radius),
            ZoneShape::Moore { radius } => dx.abs().max(dy.abs()) <= i32::from(radius),
            ZoneShape::MooreWithEars => {
                dx.abs().max(dy.abs()) <= 1
                    || (dx == 0 && dy.abs() == 2)
                    || (dy == 0 && dx.abs() == 2)
            }
        }
    }

    pub fn reach(self) -> i32 {
        match self {
            ZoneShape::VonNeumann { radius } | ZoneShape::Moore { radius } => i32::from(radius),
            ZoneShape::MooreWithEars => 2,
        }
    }

    /// Cells of the shape around `center` that lie on a `size × size` grid, row-major.
    pub fn cells_around(self, center: Pos, size: i32) -> Vec<Pos> {
        let reach = self.reach();
        let mut cells = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let pos = center.offset(dx, dy);
                if self.contains(dx, dy) && in_grid(pos, size) {
                    cells.push(pos);
                }
            }
        }
        cells
    }
}

/// The agent's perception variant announced on the first protocol line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionVariant {
    Near,
    Ears,
}

impl PerceptionVariant {
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(PerceptionVariant::Near),
            2 => Some(PerceptionVariant::Ears),
            _ => None,
        }
    }

    pub fn selector(self) -> u8 {
        match self {
            PerceptionVariant::Near => 1,
            PerceptionVariant::Ears => 2,
        }
    }

    pub fn shape(self) -> ZoneShape {
        match self {
            PerceptionVariant::Near => ZoneShape::Moore { radius: 1 },
            PerceptionVariant::Ears => ZoneShape::MooreWithEars,
        }
    }

    pub fn window(self, center: Pos, size: i32) -> Vec<Pos> {
        self.shape().cells_around(center, size)
    }
}

/// Zone shape per observer kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneTable {
    pub hulk: ZoneShape,
    pub thor: ZoneShape,
    pub captain_marvel: ZoneShape,
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self {
            hulk: ZoneShape::VonNeumann { radius: 1 },
            thor: ZoneShape::Moore { radius: 1 },
            captain_marvel: ZoneShape::MooreWithEars,
        }
    }
}

impl ZoneTable {
    pub fn shape(&self, kind: ObserverKind) -> ZoneShape {
        match kind {
            ObserverKind::Hulk => self.hulk,
            ObserverKind::Thor => self.thor,
            ObserverKind::CaptainMarvel => self.captain_marvel,
        }
    }

    pub fn zone(&self, kind: ObserverKind, observer: Pos, size: i32) -> Vec<Pos> {
        self.shape(kind).cells_around(observer, size)
    }

    /// Cells that could host an observer whose zone covers `pos`.
    pub fn potential_sites(&self, pos: Pos, size: i32) -> Vec<Pos> {
        let mut sites: Vec<Pos> = ObserverKind::ALL
            .iter()
            .flat_map(|kind| self.zone(*kind, pos, size))
            .filter(|site| *site != pos)
            .collect();
        sites.sort();
        sites.dedup();
        sites
    }
}

pub fn in_grid(pos: Pos, size: i32) -> bool {
    pos.x >= 0 && pos.y >= 0 && pos.x < size && pos.y < size
}

pub fn neighbors(p: Pos) -> [Pos; 4] {
    [
        Pos { y: p.y - 1, x: p.x },
        Pos { y: p.y, x: p.x + 1 },
        Pos { y: p.y + 1, x: p.x },
        Pos { y: p.y, x: p.x - 1 },
    ]
}

pub fn manhattan(a: Pos, b: Pos) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}
