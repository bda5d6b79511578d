use crate::classify::Category;
use geo::MultiPolygon;
use serde::Deserialize;

/// One row of the status table, with blank and `nan` cells already folded to "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    pub region_name: String,
    pub assembly_status: String,
    pub council_status: String,
    pub council_website_note: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct RegionGeometry {
    pub region_name: String,
    pub geometry: MultiPolygon<f64>,
}

/// A status row joined to its geometry, with the derived category and fill.
#[derive(Debug, Clone)]
pub struct ReconciledRegion {
    pub canonical_name: String,
    pub record: StatusRecord,
    pub geometry: MultiPolygon<f64>,
    pub category: Category,
    pub color: &'static str,
}

/// Everything the renderer draws: matched regions plus geometry no status row reached.
#[derive(Debug, Clone, Default)]
pub struct MapLayers {
    pub regions: Vec<ReconciledRegion>,
    pub unmatched: Vec<RegionGeometry>,
    // Status rows dropped because their name never resolved to a geometry.
    pub excluded: Vec<StatusRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Label offset from the region centroid, in map (degree) units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct LabelPlacement {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
    #[serde(default)]
    pub align: HAlign,
}

impl LabelPlacement {
    pub const fn new(dx: f64, dy: f64, align: HAlign) -> Self {
        Self { dx, dy, align }
    }

    pub fn has_leader(&self) -> bool {
        self.dx != 0.0 || self.dy != 0.0
    }
}
