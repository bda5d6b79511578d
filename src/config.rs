use crate::types::{HAlign, LabelPlacement};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Status-table spelling -> geometry-collection name.
    #[serde(default = "builtin_aliases")]
    pub aliases: HashMap<String, String>,
    /// Per-region label offsets, keyed by geometry-collection name.
    #[serde(default = "builtin_label_placements")]
    pub labels: HashMap<String, LabelPlacement>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub status_csv: PathBuf,
    pub geometry: PathBuf,
    pub geometry_name_field: String,
    pub columns: ColumnConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub region_name: String,
    pub assembly_status: String,
    pub council_status: String,
    pub council_website_note: String,
    pub notes: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub label_font_size: f64,
    pub legend_font_size: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            status_csv: PathBuf::from("assembly_mirror_tracker.csv"),
            geometry: PathBuf::from("india_bhuvan_states_uts.geojsonl"),
            geometry_name_field: "s_name".to_string(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            region_name: "State / UT".to_string(),
            assembly_status: "Assembly Mirror Status".to_string(),
            council_status: "Council Mirror Status".to_string(),
            council_website_note: "Council Website".to_string(),
            notes: "Notes".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("status_map.png"),
            width: 1800,
            height: 2000,
            label_font_size: 15.0,
            legend_font_size: 13.0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            output: OutputConfig::default(),
            aliases: builtin_aliases(),
            labels: builtin_label_placements(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Built-in defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn placement_for(&self, region: &str) -> LabelPlacement {
        self.labels.get(region).copied().unwrap_or_default()
    }
}

const ALIASES: &[(&str, &str)] = &[
    ("Andhra Pradesh", "Andhra Pradesh"),
    ("Arunachal Pradesh", "Arunachal Pradesh"),
    ("Assam", "Assam"),
    ("Bihar", "Bihar"),
    ("Chhattisgarh", "Chhattisgarh"),
    ("Goa", "Goa"),
    ("Gujarat", "Gujarat"),
    ("Haryana", "Haryana"),
    ("Himachal Pradesh", "Himachal Pradesh"),
    ("Jharkhand", "Jharkhand"),
    ("Karnataka", "Karnataka"),
    ("Kerala", "Kerala"),
    ("Madhya Pradesh", "Madhya Pradesh"),
    ("Maharashtra", "Maharashtra"),
    ("Manipur", "Manipur"),
    ("Meghalaya", "Meghalaya"),
    ("Mizoram", "Mizoram"),
    ("Nagaland", "Nagaland"),
    ("Odisha", "Odisha"),
    ("Punjab", "Punjab"),
    ("Rajasthan", "Rajasthan"),
    ("Sikkim", "Sikkim"),
    ("Tamil Nadu", "Tamil Nadu"),
    ("Telangana", "Telangana"),
    ("Tripura", "Tripura"),
    ("Uttar Pradesh", "Uttar Pradesh"),
    ("Uttarakhand", "Uttarakhand"),
    ("West Bengal", "West Bengal"),
    ("Delhi", "Delhi"),
    ("Puducherry", "Puducherry"),
    ("Jammu and Kashmir", "Jammu and Kashmir"),
    ("Union Territory of Jammu and Kashmir", "Jammu and Kashmir"),
    ("Union Territory of Ladakh", "Ladakh"),
];

const LABEL_PLACEMENTS: &[(&str, LabelPlacement)] = &[
    ("Kerala", LabelPlacement::new(-3.5, -2.0, HAlign::Right)),
    ("Tamil Nadu", LabelPlacement::new(3.5, -1.0, HAlign::Left)),
    ("Karnataka", LabelPlacement::new(-3.5, -0.5, HAlign::Right)),
    ("Goa", LabelPlacement::new(-4.0, -1.5, HAlign::Right)),
    ("Maharashtra", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("Gujarat", LabelPlacement::new(-4.0, 2.0, HAlign::Right)),
    ("Rajasthan", LabelPlacement::new(-3.5, 2.0, HAlign::Right)),
    ("Madhya Pradesh", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("Uttar Pradesh", LabelPlacement::new(5.0, 6.0, HAlign::Left)),
    ("Bihar", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("West Bengal", LabelPlacement::new(3.0, 0.0, HAlign::Left)),
    ("Jharkhand", LabelPlacement::new(0.0, -0.5, HAlign::Center)),
    ("Odisha", LabelPlacement::new(0.0, -1.5, HAlign::Center)),
    ("Chhattisgarh", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("Andhra Pradesh", LabelPlacement::new(3.5, -0.5, HAlign::Left)),
    ("Telangana", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("Punjab", LabelPlacement::new(-2.0, 2.0, HAlign::Right)),
    ("Haryana", LabelPlacement::new(2.5, 0.5, HAlign::Left)),
    ("Delhi", LabelPlacement::new(3.0, 1.0, HAlign::Left)),
    ("Uttarakhand", LabelPlacement::new(0.0, 1.5, HAlign::Center)),
    ("Himachal Pradesh", LabelPlacement::new(-2.0, 2.0, HAlign::Right)),
    ("Assam", LabelPlacement::new(0.0, 0.0, HAlign::Center)),
    ("Meghalaya", LabelPlacement::new(3.0, -1.5, HAlign::Left)),
    ("Tripura", LabelPlacement::new(3.5, -0.5, HAlign::Left)),
    ("Mizoram", LabelPlacement::new(3.5, 0.5, HAlign::Left)),
    ("Manipur", LabelPlacement::new(3.5, 1.0, HAlign::Left)),
    ("Nagaland", LabelPlacement::new(3.5, 1.5, HAlign::Left)),
    ("Arunachal Pradesh", LabelPlacement::new(0.0, 2.0, HAlign::Center)),
    ("Sikkim", LabelPlacement::new(-3.0, 0.5, HAlign::Right)),
    ("Puducherry", LabelPlacement::new(3.5, -0.5, HAlign::Left)),
    ("Jammu and Kashmir", LabelPlacement::new(-2.0, 3.0, HAlign::Right)),
    ("Ladakh", LabelPlacement::new(0.0, 3.0, HAlign::Center)),
];

pub fn builtin_aliases() -> HashMap<String, String> {
    ALIASES
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

pub fn builtin_label_placements() -> HashMap<String, LabelPlacement> {
    LABEL_PLACEMENTS
        .iter()
        .map(|(name, placement)| (name.to_string(), *placement))
        .collect()
}
