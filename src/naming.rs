//! File-name layouts for per-configuration result files.
//!
//! A layout is a template such as
//! `{variant}_{track_len}_{stddev}_{sweep}_{budget}_..._{sweep}` where
//! `{variant}` and `{sweep}` are filled per file and every other placeholder
//! is a fixed parameter token. Resolution is pure string assembly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{SweepPoint, VariantConfig};
use crate::CompareError;

const VARIANT_KEY: &str = "variant";
const SWEEP_KEY: &str = "sweep";

/// Field order of the simulator's output names, shared by every preset.
const SIMULATOR_TEMPLATE: &str = "{variant}_{track_len}_{stddev}_{sweep}_{budget}_{horizon}_{uct_cst}_{discount_factor}_{epsilon}_{model_track_len}_{model_stddev}_{sweep}";
const SINGLE_SWEEP_TEMPLATE: &str = "{variant}_{track_len}_{stddev}_{failure_probability}_{budget}_{horizon}_{uct_cst}_{discount_factor}_{epsilon}_{model_track_len}_{model_stddev}_{sweep}";

/// Layouts observed across experiment batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreset {
    /// 25-cell track, budget 100, horizon 40.
    LongRun,
    /// 2-cell track, budget 20, horizon 10.
    ShortRun,
    /// Short-run parameters with only the model failure probability swept.
    SingleSweep,
}

impl LayoutPreset {
    pub fn template(self) -> &'static str {
        match self {
            LayoutPreset::LongRun | LayoutPreset::ShortRun => SIMULATOR_TEMPLATE,
            LayoutPreset::SingleSweep => SINGLE_SWEEP_TEMPLATE,
        }
    }

    pub fn params(self) -> BTreeMap<String, String> {
        let pairs: &[(&str, &str)] = match self {
            LayoutPreset::LongRun => &[
                ("track_len", "25"),
                ("stddev", "000"),
                ("budget", "100"),
                ("horizon", "40"),
                ("uct_cst", "2"),
                ("discount_factor", "090"),
                ("epsilon", "000"),
                ("model_track_len", "25"),
                ("model_stddev", "000"),
            ],
            LayoutPreset::ShortRun => &[
                ("track_len", "2"),
                ("stddev", "00"),
                ("budget", "20"),
                ("horizon", "10"),
                ("uct_cst", "2"),
                ("discount_factor", "09"),
                ("epsilon", "00"),
                ("model_track_len", "2"),
                ("model_stddev", "00"),
            ],
            LayoutPreset::SingleSweep => &[
                ("track_len", "2"),
                ("stddev", "00"),
                ("failure_probability", "00"),
                ("budget", "20"),
                ("horizon", "10"),
                ("uct_cst", "2"),
                ("discount_factor", "09"),
                ("epsilon", "00"),
                ("model_track_len", "2"),
                ("model_stddev", "00"),
            ],
        };

        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variant,
    Sweep,
    Param(String),
}

/// Parsed file-name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingLayout {
    segments: Vec<Segment>,
}

impl NamingLayout {
    pub fn parse(template: &str) -> Result<Self, CompareError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(layout_error(template, "nested '{'"));
                            }
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(layout_error(template, "unclosed '{'"));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(layout_error(template, "empty placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(match name {
                        VARIANT_KEY => Segment::Variant,
                        SWEEP_KEY => Segment::Sweep,
                        other => Segment::Param(other.to_string()),
                    });
                }
                '}' => return Err(layout_error(template, "unmatched '}'")),
                '/' | '\\' => {
                    return Err(layout_error(template, "path separators belong in base_dir"));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Variant) {
            return Err(layout_error(template, "missing {variant} placeholder"));
        }
        if !segments.contains(&Segment::Sweep) {
            return Err(layout_error(template, "missing {sweep} placeholder"));
        }

        Ok(Self { segments })
    }

    /// Names of the fixed parameters the template refers to, in order of first use.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Param(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        names
    }

    /// How many times the sweep token is embedded in a name.
    pub fn sweep_occurrences(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Sweep))
            .count()
    }
}

impl fmt::Display for NamingLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Variant => write!(f, "{{{VARIANT_KEY}}}")?,
                Segment::Sweep => write!(f, "{{{SWEEP_KEY}}}")?,
                Segment::Param(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

fn layout_error(template: &str, reason: &str) -> CompareError {
    CompareError::Config(format!("layout template {template:?}: {reason}"))
}

/// Builds result-file paths for (variant, sweep point) pairs.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
    layout: NamingLayout,
    params: BTreeMap<String, String>,
}

impl PathResolver {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        layout: NamingLayout,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            layout,
            params,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn layout(&self) -> &NamingLayout {
        &self.layout
    }

    /// File name (without directory) for one variant at one sweep point.
    pub fn file_name(
        &self,
        variant: &VariantConfig,
        point: &SweepPoint,
    ) -> Result<String, CompareError> {
        if variant.id.is_empty() {
            return Err(CompareError::Config("variant id must not be empty".to_string()));
        }
        if point.token.is_empty() {
            return Err(CompareError::Config(format!(
                "sweep point {} has an empty token",
                point.value
            )));
        }

        let mut name = String::new();
        for segment in &self.layout.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Variant => name.push_str(&variant.id),
                Segment::Sweep => name.push_str(&point.token),
                Segment::Param(key) => {
                    let value = variant
                        .params
                        .get(key)
                        .or_else(|| self.params.get(key))
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| {
                            CompareError::Config(format!(
                                "layout parameter `{key}` is not set for variant `{}`",
                                variant.id
                            ))
                        })?;
                    name.push_str(value);
                }
            }
        }
        name.push_str(".csv");
        Ok(name)
    }

    pub fn resolve(
        &self,
        variant: &VariantConfig,
        point: &SweepPoint,
    ) -> Result<PathBuf, CompareError> {
        Ok(self.base_dir.join(self.file_name(variant, point)?))
    }
}
