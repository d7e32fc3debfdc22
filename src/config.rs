use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::loader::MissingValuePolicy;
use crate::metric::Metric;
use crate::naming::{LayoutPreset, NamingLayout, PathResolver};
use crate::transform::{Transform, TransformPolicy};
use crate::CompareError;

pub const DEFAULT_BINS: usize = 20;

/// Colours of the first three variants.
pub const DEFAULT_PALETTE: [Rgb; 3] = [
    Rgb(0x33, 0x33, 0x99),
    Rgb(0xff, 0x66, 0x00),
    Rgb(0x00, 0xcc, 0x66),
];

/// 8-bit RGB colour, written as `#rrggbb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse_hex(raw: &str) -> Result<Self, CompareError> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CompareError::Config(format!(
                "colour {raw:?} is not of the form #rrggbb"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CompareError::Config(format!("colour {raw:?}: {e}")))
        };
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Mean and standard deviation across the sweep.
    Trend,
    /// Per-run histograms at one sweep point.
    Distribution,
}

/// One point of the sweep: the token used in file names and its numeric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub token: String,
    pub value: f64,
}

impl SweepPoint {
    /// Derives the value from a generator token: the first digit is the integer
    /// part and the remaining digits the fraction (`"005"` is 0.05, `"1"` is 1.0).
    pub fn from_token(token: &str) -> Result<Self, CompareError> {
        let token = token.trim();
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(CompareError::Config(format!(
                "sweep token {token:?} needs an explicit value"
            )));
        }
        let (int_part, frac_part) = token.split_at(1);
        let literal = if frac_part.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac_part}")
        };
        let value = literal
            .parse::<f64>()
            .map_err(|e| CompareError::Config(format!("sweep token {token:?}: {e}")))?;
        Ok(Self {
            token: token.to_string(),
            value,
        })
    }
}

/// A validated algorithm variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantConfig {
    pub id: String,
    pub display_name: String,
    pub color: Rgb,
    /// Fixed layout tokens overriding the layout-level ones for this variant.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub preset: Option<LayoutPreset>,
    /// Overrides the preset template.
    pub template: Option<String>,
    /// Merged over the preset parameters.
    pub params: BTreeMap<String, String>,
}

impl LayoutConfig {
    pub fn preset(preset: LayoutPreset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    fn build(&self) -> Result<(NamingLayout, BTreeMap<String, String>), CompareError> {
        let template = match (&self.template, self.preset) {
            (Some(template), _) => template.as_str(),
            (None, Some(preset)) => preset.template(),
            (None, None) => {
                return Err(CompareError::Config(
                    "layout needs a preset or a template".to_string(),
                ))
            }
        };
        let layout = NamingLayout::parse(template)?;

        let used = layout.param_names();
        for key in self.params.keys() {
            if !used.contains(&key.as_str()) {
                warn!(param = %key, layout = %layout, "layout parameter not used by the template");
            }
        }

        let mut params = self.preset.map(LayoutPreset::params).unwrap_or_default();
        params.extend(self.params.clone());
        Ok((layout, params))
    }
}

/// Analysis configuration as read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub base_dir: PathBuf,
    pub use_log: bool,
    /// Per-metric log overrides on top of `use_log`.
    pub log_metrics: BTreeMap<Metric, bool>,
    pub render_mode: RenderMode,
    pub missing_values: MissingValuePolicy,
    pub bins: usize,
    /// Sweep token shown in distribution mode; the first sweep point when unset.
    pub distribution_sweep: Option<String>,
    pub layout: LayoutConfig,
    pub sweep: Vec<SweepEntry>,
    pub variants: Vec<VariantEntry>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        let tokens = [
            "000", "005", "010", "015", "020", "025", "030", "035", "040", "045", "050",
        ];
        let variants = [
            ("0", "Vanilla UCT"),
            ("1", "Plain OLUCT"),
            ("2", "State mode-test OLUCT"),
        ];

        Self {
            base_dir: PathBuf::from("data/backup/long"),
            use_log: false,
            log_metrics: BTreeMap::new(),
            render_mode: RenderMode::Trend,
            missing_values: MissingValuePolicy::Drop,
            bins: DEFAULT_BINS,
            distribution_sweep: None,
            layout: LayoutConfig::preset(LayoutPreset::LongRun),
            sweep: tokens
                .iter()
                .map(|t| SweepEntry {
                    token: t.to_string(),
                    value: None,
                })
                .collect(),
            variants: variants
                .iter()
                .zip(DEFAULT_PALETTE)
                .map(|((id, name), color)| VariantEntry {
                    id: id.to_string(),
                    display_name: Some(name.to_string()),
                    color: Some(color.to_hex()),
                    params: BTreeMap::new(),
                })
                .collect(),
        }
    }
}

impl CompareConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, CompareError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            CompareError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let cfg: CompareConfig = toml::from_str(&raw).map_err(|e| {
            CompareError::Config(format!("failed to parse TOML config {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CompareError> {
        toml::from_str(raw).map_err(|e| CompareError::Config(format!("invalid TOML: {e}")))
    }

    pub fn transform_policy(&self) -> TransformPolicy {
        let mut policy = TransformPolicy::uniform(self.use_log);
        for (&metric, &log) in &self.log_metrics {
            policy.set(metric, Transform::from_flag(log));
        }
        policy
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        self.resolve().map(|_| ())
    }

    /// Checks every setting and builds the value object the pipeline runs on.
    /// No file is touched here.
    pub fn resolve(&self) -> Result<RenderConfig, CompareError> {
        if self.bins == 0 {
            return Err(CompareError::Config("bins must be greater than zero".to_string()));
        }

        let sweep = resolve_sweep(&self.sweep)?;
        let variants = resolve_variants(&self.variants)?;

        let (layout, params) = self.layout.build()?;
        let resolver = PathResolver::new(self.base_dir.clone(), layout, params);
        for variant in &variants {
            resolver.file_name(variant, &sweep[0])?;
        }

        let distribution_point = match &self.distribution_sweep {
            Some(token) => sweep
                .iter()
                .find(|p| p.token == *token)
                .cloned()
                .ok_or_else(|| {
                    CompareError::Config(format!(
                        "distribution_sweep {token:?} is not one of the sweep tokens"
                    ))
                })?,
            None => sweep[0].clone(),
        };

        Ok(RenderConfig {
            resolver,
            sweep,
            variants,
            policy: self.transform_policy(),
            render_mode: self.render_mode,
            missing_values: self.missing_values,
            bins: self.bins,
            distribution_point,
        })
    }
}

fn resolve_sweep(entries: &[SweepEntry]) -> Result<Vec<SweepPoint>, CompareError> {
    if entries.is_empty() {
        return Err(CompareError::Config("sweep must contain at least one point".to_string()));
    }

    let mut points = Vec::with_capacity(entries.len());
    for entry in entries {
        let point = match entry.value {
            Some(value) => SweepPoint {
                token: entry.token.trim().to_string(),
                value,
            },
            None => SweepPoint::from_token(&entry.token)?,
        };
        if point.token.is_empty() {
            return Err(CompareError::Config("sweep tokens must not be empty".to_string()));
        }
        if !point.value.is_finite() {
            return Err(CompareError::Config(format!(
                "sweep point {:?} has a non-finite value",
                point.token
            )));
        }
        if points
            .iter()
            .any(|p: &SweepPoint| p.token == point.token || p.value == point.value)
        {
            return Err(CompareError::Config(format!(
                "duplicate sweep point {:?} ({})",
                point.token, point.value
            )));
        }
        points.push(point);
    }
    Ok(points)
}

fn resolve_variants(entries: &[VariantEntry]) -> Result<Vec<VariantConfig>, CompareError> {
    if entries.is_empty() {
        return Err(CompareError::Config("at least one variant is required".to_string()));
    }

    let mut seen = HashSet::new();
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let id = entry.id.trim().to_string();
            if id.is_empty() {
                return Err(CompareError::Config(format!("variant #{idx} has an empty id")));
            }
            if !seen.insert(id.clone()) {
                return Err(CompareError::Config(format!("duplicate variant id {id:?}")));
            }
            let color = match &entry.color {
                Some(raw) => Rgb::parse_hex(raw)?,
                None => palette_color(idx),
            };
            Ok(VariantConfig {
                display_name: entry.display_name.clone().unwrap_or_else(|| id.clone()),
                id,
                color,
                params: entry.params.clone(),
            })
        })
        .collect()
}

/// Colour for the variant at `idx` when none is configured. Cycles the
/// default palette and darkens each further cycle so colours stay distinct.
pub fn palette_color(idx: usize) -> Rgb {
    let base = DEFAULT_PALETTE[idx % DEFAULT_PALETTE.len()];
    let cycle = (idx / DEFAULT_PALETTE.len()) as u32;
    let shade = |c: u8| (c as u32 * 8 / (8 + 2 * cycle.min(3))) as u8;
    Rgb(shade(base.0), shade(base.1), shade(base.2))
}

/// Validated configuration consumed by the aggregation and render stages.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub resolver: PathResolver,
    pub sweep: Vec<SweepPoint>,
    pub variants: Vec<VariantConfig>,
    pub policy: TransformPolicy,
    pub render_mode: RenderMode,
    pub missing_values: MissingValuePolicy,
    pub bins: usize,
    pub distribution_point: SweepPoint,
}
