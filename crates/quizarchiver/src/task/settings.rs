//! Typed job settings, parsed once from the flat key/value map the job
//! creation form stores.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::variables::{validate_pattern, PatternKind};
use crate::error::WorkerError;
use crate::report::{ReportSection, SectionSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperFormat {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    Letter,
    Legal,
    Tabloid,
    Ledger,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 11] = [
        PaperFormat::A0,
        PaperFormat::A1,
        PaperFormat::A2,
        PaperFormat::A3,
        PaperFormat::A4,
        PaperFormat::A5,
        PaperFormat::A6,
        PaperFormat::Letter,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
        PaperFormat::Ledger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
            PaperFormat::A6 => "A6",
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
            PaperFormat::Ledger => "Ledger",
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown paper format '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptimize {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub paper_format: PaperFormat,
    pub foldername_pattern: String,
    pub filename_pattern: String,
    /// `None` when image optimisation is disabled.
    pub image_optimize: Option<ImageOptimize>,
    pub keep_html_files: bool,
    pub sections: SectionSet,
}

const KEY_PAPER_FORMAT: &str = "paper_format";
const KEY_FOLDERNAME_PATTERN: &str = "attempt_foldername_pattern";
const KEY_FILENAME_PATTERN: &str = "attempt_filename_pattern";
const KEY_IMAGE_OPTIMIZE: &str = "image_optimize";
const KEY_IMAGE_OPTIMIZE_WIDTH: &str = "image_optimize_width";
const KEY_IMAGE_OPTIMIZE_HEIGHT: &str = "image_optimize_height";
const KEY_IMAGE_OPTIMIZE_QUALITY: &str = "image_optimize_quality";
const KEY_KEEP_HTML_FILES: &str = "keep_html_files";

impl JobSettings {
    /// Every key a settings map must carry.
    pub fn expected_keys() -> Vec<String> {
        let mut keys: Vec<String> = [
            KEY_PAPER_FORMAT,
            KEY_FOLDERNAME_PATTERN,
            KEY_FILENAME_PATTERN,
            KEY_IMAGE_OPTIMIZE,
            KEY_IMAGE_OPTIMIZE_WIDTH,
            KEY_IMAGE_OPTIMIZE_HEIGHT,
            KEY_IMAGE_OPTIMIZE_QUALITY,
            KEY_KEEP_HTML_FILES,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        keys.extend(ReportSection::ALL.iter().map(|s| s.setting_key()));
        keys
    }

    /// Parses and validates a settings map. Fails on the first missing or
    /// malformed key; nothing is defaulted.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Result<Self, WorkerError> {
        if let Some(missing) = Self::expected_keys()
            .into_iter()
            .find(|k| !map.contains_key(k) || map[k].is_null())
        {
            return Err(WorkerError::Precondition(format!(
                "Missing required job setting: {}",
                missing
            )));
        }

        let paper_format = get_str(map, KEY_PAPER_FORMAT)?
            .parse::<PaperFormat>()
            .map_err(WorkerError::Precondition)?;

        let foldername_pattern = get_str(map, KEY_FOLDERNAME_PATTERN)?.to_string();
        let filename_pattern = get_str(map, KEY_FILENAME_PATTERN)?.to_string();
        validate_pattern(&foldername_pattern, PatternKind::Folder)
            .map_err(|e| WorkerError::Precondition(e.to_string()))?;
        validate_pattern(&filename_pattern, PatternKind::File)
            .map_err(|e| WorkerError::Precondition(e.to_string()))?;

        let image_optimize = if get_bool(map, KEY_IMAGE_OPTIMIZE)? {
            let quality = get_uint(map, KEY_IMAGE_OPTIMIZE_QUALITY)?;
            if quality > 100 {
                return Err(WorkerError::Precondition(format!(
                    "{} must be within 0..=100, got {}",
                    KEY_IMAGE_OPTIMIZE_QUALITY, quality
                )));
            }
            Some(ImageOptimize {
                width: to_u32(KEY_IMAGE_OPTIMIZE_WIDTH, get_uint(map, KEY_IMAGE_OPTIMIZE_WIDTH)?)?,
                height: to_u32(
                    KEY_IMAGE_OPTIMIZE_HEIGHT,
                    get_uint(map, KEY_IMAGE_OPTIMIZE_HEIGHT)?,
                )?,
                quality: quality as u8,
            })
        } else {
            None
        };

        let mut sections = SectionSet::none();
        for section in ReportSection::ALL {
            sections.set(section, get_bool(map, &section.setting_key())?);
        }

        Ok(Self {
            paper_format,
            foldername_pattern,
            filename_pattern,
            image_optimize,
            keep_html_files: get_bool(map, KEY_KEEP_HTML_FILES)?,
            sections,
        })
    }

    /// Flat map with the defaults of the job creation form.
    pub fn default_map() -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert(KEY_PAPER_FORMAT.to_string(), Value::from("A4"));
        map.insert(
            KEY_FOLDERNAME_PATTERN.to_string(),
            Value::from("${username}/${quizname}"),
        );
        map.insert(
            KEY_FILENAME_PATTERN.to_string(),
            Value::from("attempt-${attemptid}-${username}_${date}-${time}"),
        );
        map.insert(KEY_IMAGE_OPTIMIZE.to_string(), Value::from(0));
        map.insert(KEY_IMAGE_OPTIMIZE_WIDTH.to_string(), Value::from(1280));
        map.insert(KEY_IMAGE_OPTIMIZE_HEIGHT.to_string(), Value::from(1280));
        map.insert(KEY_IMAGE_OPTIMIZE_QUALITY.to_string(), Value::from(85));
        map.insert(KEY_KEEP_HTML_FILES.to_string(), Value::from(0));
        for section in ReportSection::ALL {
            map.insert(section.setting_key(), Value::from(1));
        }
        map
    }
}

fn get_str<'a>(map: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a str, WorkerError> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| WorkerError::Precondition(format!("Job setting {} must be a string", key)))
}

/// Accepts JSON booleans as well as the 0/1 integers and strings forms emit.
fn get_bool(map: &BTreeMap<String, Value>, key: &str) -> Result<bool, WorkerError> {
    match map.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(false),
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(true),
        Some(Value::String(s)) if s == "0" => Ok(false),
        Some(Value::String(s)) if s == "1" => Ok(true),
        _ => Err(WorkerError::Precondition(format!(
            "Job setting {} must be a boolean",
            key
        ))),
    }
}

fn get_uint(map: &BTreeMap<String, Value>, key: &str) -> Result<u64, WorkerError> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        WorkerError::Precondition(format!("Job setting {} must be a non-negative integer", key))
    })
}

fn to_u32(key: &str, value: u64) -> Result<u32, WorkerError> {
    u32::try_from(value)
        .map_err(|_| WorkerError::Precondition(format!("Job setting {} is out of range", key)))
}
