use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingColor {
    Green,
    Yellow,
    Red,
}

impl RatingColor {
    /// sRGB hex value used for the rating swatch and the legend box.
    pub fn rgb(self) -> &'static str {
        match self {
            RatingColor::Green => "00B050",
            RatingColor::Yellow => "FFC000",
            RatingColor::Red => "FF0000",
        }
    }

    pub fn legend_label(self) -> &'static str {
        match self {
            RatingColor::Green => "Target achieved / on track",
            RatingColor::Yellow => "Miss in target but on track for the year",
            RatingColor::Red => "Severe delays",
        }
    }

    pub const ALL: [RatingColor; 3] = [RatingColor::Green, RatingColor::Yellow, RatingColor::Red];
}

#[derive(Debug, thiserror::Error)]
pub enum StatusMapError {
    #[error("failed to read status color map {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid status color map {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Status-to-color table. Unknown statuses fall through to `default`.
///
/// Shape on disk:
/// `{"default": "green", "statuses": {"delayed": "red", ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusColorMap {
    #[serde(default = "default_color")]
    pub default: RatingColor,
    pub statuses: HashMap<String, RatingColor>,
}

fn default_color() -> RatingColor {
    RatingColor::Green
}

impl Default for StatusColorMap {
    fn default() -> Self {
        let table = [
            ("on-track-yearly", RatingColor::Green),
            ("on-track", RatingColor::Green),
            ("target-achieved", RatingColor::Green),
            ("completed", RatingColor::Green),
            ("not-started", RatingColor::Yellow),
            ("minor-delay", RatingColor::Yellow),
            ("severe-delay", RatingColor::Red),
            ("delayed", RatingColor::Red),
        ];

        Self {
            default: RatingColor::Green,
            statuses: table
                .into_iter()
                .map(|(status, color)| (status.to_string(), color))
                .collect(),
        }
    }
}

impl StatusColorMap {
    pub fn from_json_file(path: &Path) -> Result<Self, StatusMapError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StatusMapError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StatusMapError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Built-in table unless a path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, StatusMapError> {
        match path {
            Some(path) => {
                let map = Self::from_json_file(path)?;
                tracing::info!(
                    path = %path.display(),
                    statuses = map.statuses.len(),
                    "Loaded status color map"
                );
                Ok(map)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn color_for(&self, status: &str) -> RatingColor {
        self.statuses
            .get(status.trim())
            .copied()
            .unwrap_or(self.default)
    }
}
