//! Turns string-typed attribute entries into typed netCDF attributes.

use std::fmt;

use crate::{
    error::{ConvertError, Result},
    model::{AttributeEntry, CoordinateType, Measurement, PlatformConstant, ValueType},
};

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Int(i32),
    Float(f32),
    Double(f64),
    Boolean(bool),
}

impl TypedValue {
    pub fn coerce(name: &str, raw: &str, ty: ValueType) -> Result<Self> {
        let raw = raw.trim();
        let invalid = |type_name| ConvertError::InvalidAttributeValue {
            name: name.to_string(),
            value: raw.to_string(),
            type_name,
        };
        Ok(match ty {
            ValueType::Text => TypedValue::Text(raw.to_string()),
            ValueType::Integer => TypedValue::Int(raw.parse().map_err(|_| invalid("INT"))?),
            ValueType::Float => TypedValue::Float(raw.parse().map_err(|_| invalid("FLOAT"))?),
            ValueType::Double => TypedValue::Double(raw.parse().map_err(|_| invalid("DOUBLE"))?),
            ValueType::Boolean => {
                TypedValue::Boolean(parse_bool(raw).ok_or_else(|| invalid("BOOLEAN"))?)
            }
        })
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(s) => f.write_str(s),
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedAttribute {
    pub name: String,
    pub value: TypedValue,
}

impl TypedAttribute {
    pub fn text(name: &str, value: &str) -> Self {
        TypedAttribute { name: name.to_string(), value: TypedValue::Text(value.to_string()) }
    }

    pub fn new(name: &str, value: TypedValue) -> Self {
        TypedAttribute { name: name.to_string(), value }
    }
}

/// Coerce every entry, in order. Empty names are dropped, since the wizard
/// submits blank rows for unused fields.
pub fn build_attributes(target: &str, entries: &[AttributeEntry]) -> Result<Vec<TypedAttribute>> {
    entries
        .iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| {
            let ty = ValueType::parse(&e.value_type, &format!("{target}:{}", e.name))?;
            Ok(TypedAttribute {
                name: e.name.trim().to_string(),
                value: TypedValue::coerce(&e.name, &e.value, ty)?,
            })
        })
        .collect()
}

/// Append `defaults` whose names the user did not already set.
pub fn merge_defaults(attrs: &mut Vec<TypedAttribute>, defaults: Vec<TypedAttribute>) {
    for d in defaults {
        if !attrs.iter().any(|a| a.name == d.name) {
            attrs.push(d);
        }
    }
}

/// CF attributes a coordinate variable of this type must carry.
pub fn coordinate_defaults(ty: CoordinateType, user: &[TypedAttribute]) -> Vec<TypedAttribute> {
    match ty {
        CoordinateType::Latitude => vec![
            TypedAttribute::text("standard_name", "latitude"),
            TypedAttribute::text("units", "degrees_north"),
            TypedAttribute::text("axis", "Y"),
        ],
        CoordinateType::Longitude => vec![
            TypedAttribute::text("standard_name", "longitude"),
            TypedAttribute::text("units", "degrees_east"),
            TypedAttribute::text("axis", "X"),
        ],
        CoordinateType::Vertical => {
            let down = user
                .iter()
                .any(|a| a.name == "positive" && a.value.to_string().eq_ignore_ascii_case("down"));
            vec![
                TypedAttribute::text("standard_name", if down { "depth" } else { "altitude" }),
                TypedAttribute::text("positive", if down { "down" } else { "up" }),
                TypedAttribute::text("axis", "Z"),
            ]
        }
        CoordinateType::RelativeTime => vec![
            TypedAttribute::text("standard_name", "time"),
            TypedAttribute::text("axis", "T"),
        ],
        CoordinateType::FullDateTime | CoordinateType::DateOnly | CoordinateType::TimeOnly => {
            Vec::new()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Platform constants
// ─────────────────────────────────────────────────────────────────────

/// One fixed-position scalar coordinate derived from platform metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarCoordinate {
    pub name: &'static str,
    pub value: f32,
    pub attributes: Vec<TypedAttribute>,
}

/// Normalize a horizontal position to CF's east/north convention.
/// West and south values flip sign.
pub fn normalize_position(kind: CoordinateType, m: &Measurement) -> Result<(f32, &'static str)> {
    let value: f32 = m.value.trim().parse().map_err(|_| ConvertError::InvalidAttributeValue {
        name: kind.wire_name().to_string(),
        value: m.value.clone(),
        type_name: "FLOAT",
    })?;
    let units = m.units.trim().to_ascii_lowercase();
    let (flip, canonical) = match kind {
        CoordinateType::Latitude => (units == "degrees_south", "degrees_north"),
        CoordinateType::Longitude => (units == "degrees_west", "degrees_east"),
        other => {
            return Err(ConvertError::InvalidConfiguration(format!(
                "{other} is not a horizontal position"
            )))
        }
    };
    Ok((if flip { -value } else { value }, canonical))
}

pub fn platform_scalars(platform: &PlatformConstant) -> Result<Vec<ScalarCoordinate>> {
    let mut out = Vec::new();
    if let Some(lat) = &platform.latitude {
        let (value, units) = normalize_position(CoordinateType::Latitude, lat)?;
        out.push(ScalarCoordinate {
            name: "latitude",
            value,
            attributes: vec![
                TypedAttribute::text("units", units),
                TypedAttribute::text("standard_name", "latitude"),
                TypedAttribute::text("long_name", "station latitude"),
            ],
        });
    }
    if let Some(lon) = &platform.longitude {
        let (value, units) = normalize_position(CoordinateType::Longitude, lon)?;
        out.push(ScalarCoordinate {
            name: "longitude",
            value,
            attributes: vec![
                TypedAttribute::text("units", units),
                TypedAttribute::text("standard_name", "longitude"),
                TypedAttribute::text("long_name", "station longitude"),
            ],
        });
    }
    if let Some(alt) = &platform.altitude {
        let value: f32 =
            alt.value.trim().parse().map_err(|_| ConvertError::InvalidAttributeValue {
                name: "altitude".to_string(),
                value: alt.value.clone(),
                type_name: "FLOAT",
            })?;
        let units = if alt.units.trim().is_empty() { "m" } else { alt.units.trim() };
        out.push(ScalarCoordinate {
            name: "altitude",
            value,
            attributes: vec![
                TypedAttribute::text("units", units),
                TypedAttribute::text("standard_name", "altitude"),
                TypedAttribute::text("positive", "up"),
                TypedAttribute::text("long_name", "station altitude"),
            ],
        });
    }
    Ok(out)
}
