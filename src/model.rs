//! Per-conversion domain types: what the user declared about the file.
//!
//! Everything here is assembled fresh for one transaction and handed through
//! the pipeline by reference.

use std::fmt;

use crate::error::{ConvertError, Result};

// ─────────────────────────────────────────────────────────────────────
// Value types
// ─────────────────────────────────────────────────────────────────────

/// Declared type of a column or of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Text,
    Integer,
    Float,
    Double,
    Boolean,
}

impl ValueType {
    /// Accepts the wizard spellings, case-insensitively.
    pub fn parse(tag: &str, target: &str) -> Result<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "STRING" | "TEXT" => Ok(ValueType::Text),
            "INT" | "INTEGER" => Ok(ValueType::Integer),
            "FLOAT" => Ok(ValueType::Float),
            "DOUBLE" => Ok(ValueType::Double),
            "BOOLEAN" => Ok(ValueType::Boolean),
            _ => Err(ConvertError::UnknownType {
                target: target.to_string(),
                type_name: tag.to_string(),
            }),
        }
    }

    /// Canonical tag written back into templates.
    pub fn tag(self) -> &'static str {
        match self {
            ValueType::Text => "STRING",
            ValueType::Integer => "INT",
            ValueType::Float => "FLOAT",
            ValueType::Double => "DOUBLE",
            ValueType::Boolean => "BOOLEAN",
        }
    }

    /// Type name as it appears in NcML `type="..."`.
    pub fn ncml_name(self) -> &'static str {
        match self {
            ValueType::Text => "String",
            ValueType::Integer => "int",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Boolean => "byte",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Coordinate roles
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoordinateType {
    Latitude,
    Longitude,
    /// Depth or altitude.
    Vertical,
    RelativeTime,
    FullDateTime,
    DateOnly,
    TimeOnly,
}

impl CoordinateType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim() {
            "latitude" | "lat" => Ok(CoordinateType::Latitude),
            "longitude" | "lon" => Ok(CoordinateType::Longitude),
            "vertical" | "depth" | "altitude" | "alt" => Ok(CoordinateType::Vertical),
            "relTime" => Ok(CoordinateType::RelativeTime),
            "fullDateTime" => Ok(CoordinateType::FullDateTime),
            "dateOnly" => Ok(CoordinateType::DateOnly),
            "timeOnly" => Ok(CoordinateType::TimeOnly),
            other => Err(ConvertError::InvalidConfiguration(format!(
                "unknown coordinate variable type '{other}'"
            ))),
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            CoordinateType::Latitude => "latitude",
            CoordinateType::Longitude => "longitude",
            CoordinateType::Vertical => "vertical",
            CoordinateType::RelativeTime => "relTime",
            CoordinateType::FullDateTime => "fullDateTime",
            CoordinateType::DateOnly => "dateOnly",
            CoordinateType::TimeOnly => "timeOnly",
        }
    }

    /// Date/time pieces feed the derived time variable instead of standing
    /// on their own as coordinates.
    pub fn is_time_component(self) -> bool {
        matches!(
            self,
            CoordinateType::FullDateTime | CoordinateType::DateOnly | CoordinateType::TimeOnly
        )
    }
}

impl fmt::Display for CoordinateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ─────────────────────────────────────────────────────────────────────
// CF discrete sampling geometry
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Point,
    TimeSeries,
    Trajectory,
    Profile,
    TimeSeriesProfile,
    TrajectoryProfile,
}

impl FeatureType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(FeatureType::Point),
            "timeseries" => Ok(FeatureType::TimeSeries),
            "trajectory" => Ok(FeatureType::Trajectory),
            "profile" => Ok(FeatureType::Profile),
            "timeseriesprofile" => Ok(FeatureType::TimeSeriesProfile),
            "trajectoryprofile" => Ok(FeatureType::TrajectoryProfile),
            other => Err(ConvertError::InvalidConfiguration(format!(
                "unknown CF feature type '{other}'"
            ))),
        }
    }

    pub fn cf_name(self) -> &'static str {
        match self {
            FeatureType::Point => "point",
            FeatureType::TimeSeries => "timeSeries",
            FeatureType::Trajectory => "trajectory",
            FeatureType::Profile => "profile",
            FeatureType::TimeSeriesProfile => "timeSeriesProfile",
            FeatureType::TrajectoryProfile => "trajectoryProfile",
        }
    }

    /// `cf_role` value for the instance id variable, e.g. `timeseries_id`.
    pub fn cf_role(self) -> String {
        let base = match self {
            FeatureType::TimeSeriesProfile => FeatureType::TimeSeries,
            FeatureType::TrajectoryProfile => FeatureType::Trajectory,
            other => other,
        };
        format!("{}_id", base.cf_name().to_ascii_lowercase())
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cf_name())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────

/// (name, value, declared type, group); the value stays a string until the
/// attribute builder coerces it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeEntry {
    pub name: String,
    pub value: String,
    pub value_type: String,
    pub group: String,
}

impl AttributeEntry {
    pub fn new(name: &str, value: &str, value_type: &str) -> Self {
        AttributeEntry {
            name: name.to_string(),
            value: value.to_string(),
            value_type: value_type.to_string(),
            group: String::new(),
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnUsage {
    DoNotUse,
    Data,
    Coordinate(CoordinateType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDeclaration {
    pub column_id: usize,
    pub name: String,
    pub value_type: ValueType,
    pub usage: ColumnUsage,
    pub attributes: Vec<AttributeEntry>,
}

impl ColumnDeclaration {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A value with its units, as entered for a fixed platform position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub value: String,
    pub units: String,
}

impl Measurement {
    pub fn new(value: &str, units: &str) -> Self {
        Measurement { value: value.to_string(), units: units.to_string() }
    }
}

/// Fixed metadata of a non-moving platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformConstant {
    pub name: String,
    pub latitude: Option<Measurement>,
    pub longitude: Option<Measurement>,
    pub altitude: Option<Measurement>,
}

impl PlatformConstant {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none() && self.altitude.is_none()
    }
}
