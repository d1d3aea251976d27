//! The replayable template: every decision the user made for one
//! conversion, serialized as JSON.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    config::ServerInfo,
    delimiter::Delimiter,
    error::{ConvertError, Result},
    model::{
        AttributeEntry, ColumnDeclaration, ColumnUsage, CoordinateType, FeatureType, Measurement,
        PlatformConstant, ValueType,
    },
    platform,
};

pub const TEMPLATE_VERSION: &str = "1.0";

fn default_template_version() -> String {
    TEMPLATE_VERSION.to_string()
}

fn default_format() -> String {
    "custom".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default = "default_template_version")]
    pub template_version: String,
    #[serde(default)]
    pub rosetta_version: String,
    #[serde(default)]
    pub server_id: String,
    /// Input format family; spreadsheets arrive here already as CSV.
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_metadata: Option<PlatformMetadata>,
    /// Delimiter symbol, or its display name.
    pub delimiter: String,
    #[serde(default)]
    pub header_line_numbers: Vec<usize>,
    #[serde(default)]
    pub global_metadata: Vec<GlobalAttribute>,
    #[serde(default)]
    pub variable_info_list: Vec<VariableInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAttribute {
    pub attribute_name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub metadata_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableAttribute {
    pub metadata_key: String,
    pub metadata_value: String,
    pub metadata_value_type: String,
    #[serde(default)]
    pub metadata_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableInfo {
    pub column_id: usize,
    pub name: String,
    pub value_type: String,
    #[serde(default)]
    pub do_not_use: bool,
    #[serde(default)]
    pub coordinate_variable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_variable_type: Option<String>,
    #[serde(default)]
    pub variable_metadata: Vec<VariableAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementInfo {
    pub value: String,
    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<MeasurementInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<MeasurementInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<MeasurementInfo>,
}

fn to_measurement(m: &Option<MeasurementInfo>) -> Option<Measurement> {
    m.as_ref()
        .filter(|m| !m.value.trim().is_empty())
        .map(|m| Measurement::new(&m.value, &m.units))
}

fn from_measurement(m: &Option<Measurement>) -> Option<MeasurementInfo> {
    m.as_ref().map(|m| MeasurementInfo { value: m.value.clone(), units: m.units.clone() })
}

/// Domain-side pieces a template is written from.
pub struct TemplateParts<'a> {
    pub delimiter: &'a Delimiter,
    pub header_lines: &'a [usize],
    pub feature_type: Option<FeatureType>,
    pub community: Option<&'a str>,
    pub platform_name: Option<&'a str>,
    pub platform: Option<&'a PlatformConstant>,
    pub globals: &'a [AttributeEntry],
    pub columns: &'a [ColumnDeclaration],
}

impl Template {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?).map_err(|e| ConvertError::io(path, e))
    }

    /// Write a template back out from validated declarations, stamped with
    /// the converting server. The delimiter is stored by symbol.
    pub fn from_parts(parts: TemplateParts<'_>, server: &ServerInfo) -> Self {
        Template {
            template_version: default_template_version(),
            rosetta_version: server.version.clone(),
            server_id: server.server_id.clone(),
            format: default_format(),
            cf_type: parts.feature_type.map(|t| t.cf_name().to_string()),
            community: parts.community.map(str::to_string),
            platform: parts.platform_name.map(str::to_string),
            platform_metadata: parts.platform.map(|p| PlatformMetadata {
                name: p.name.clone(),
                latitude: from_measurement(&p.latitude),
                longitude: from_measurement(&p.longitude),
                altitude: from_measurement(&p.altitude),
            }),
            delimiter: parts.delimiter.symbol().to_string(),
            header_line_numbers: parts.header_lines.to_vec(),
            global_metadata: parts
                .globals
                .iter()
                .map(|g| GlobalAttribute {
                    attribute_name: g.name.clone(),
                    value: g.value.clone(),
                    value_type: g.value_type.clone(),
                    metadata_group: g.group.clone(),
                })
                .collect(),
            variable_info_list: parts.columns.iter().map(variable_info).collect(),
        }
    }

    pub fn delimiter(&self) -> Delimiter {
        Delimiter::from_name(&self.delimiter)
    }

    /// Explicit `cfType` first, otherwise derived from the platform.
    pub fn feature_type(&self) -> Result<FeatureType> {
        if let Some(cf) = self.cf_type.as_deref().filter(|s| !s.trim().is_empty()) {
            return FeatureType::parse(cf);
        }
        match self.platform.as_deref() {
            Some(p) => platform::feature_type_for(p).ok_or_else(|| {
                ConvertError::MissingConfiguration(format!(
                    "no CF feature type given and platform '{p}' has none"
                ))
            }),
            None => Err(ConvertError::MissingConfiguration(
                "neither a CF feature type nor a platform was given".to_string(),
            )),
        }
    }

    pub fn global_entries(&self) -> Vec<AttributeEntry> {
        self.global_metadata
            .iter()
            .map(|g| {
                AttributeEntry::new(&g.attribute_name, &g.value, &g.value_type)
                    .in_group(&g.metadata_group)
            })
            .collect()
    }

    pub fn platform_constant(&self) -> Option<PlatformConstant> {
        let meta = self.platform_metadata.as_ref()?;
        let constant = PlatformConstant {
            name: if meta.name.is_empty() {
                self.platform.clone().unwrap_or_default()
            } else {
                meta.name.clone()
            },
            latitude: to_measurement(&meta.latitude),
            longitude: to_measurement(&meta.longitude),
            altitude: to_measurement(&meta.altitude),
        };
        (!constant.is_empty() || !constant.name.is_empty()).then_some(constant)
    }

    pub fn column_declarations(&self) -> Result<Vec<ColumnDeclaration>> {
        self.variable_info_list.iter().map(declaration).collect()
    }
}

fn declaration(info: &VariableInfo) -> Result<ColumnDeclaration> {
    let usage = if info.do_not_use {
        ColumnUsage::DoNotUse
    } else if info.coordinate_variable {
        let ty = info.coordinate_variable_type.as_deref().ok_or_else(|| {
            ConvertError::MissingConfiguration(format!(
                "column {} ('{}') is a coordinate variable without a type",
                info.column_id, info.name
            ))
        })?;
        ColumnUsage::Coordinate(CoordinateType::parse(ty)?)
    } else {
        ColumnUsage::Data
    };
    // unused columns may carry no type at all
    let value_type = match usage {
        ColumnUsage::DoNotUse if info.value_type.trim().is_empty() => ValueType::Text,
        _ => ValueType::parse(&info.value_type, &info.name)?,
    };
    Ok(ColumnDeclaration {
        column_id: info.column_id,
        name: info.name.clone(),
        value_type,
        usage,
        attributes: info
            .variable_metadata
            .iter()
            .map(|m| {
                AttributeEntry::new(&m.metadata_key, &m.metadata_value, &m.metadata_value_type)
                    .in_group(&m.metadata_group)
            })
            .collect(),
    })
}

fn variable_info(column: &ColumnDeclaration) -> VariableInfo {
    let (do_not_use, coordinate) = match column.usage {
        ColumnUsage::DoNotUse => (true, None),
        ColumnUsage::Data => (false, None),
        ColumnUsage::Coordinate(t) => (false, Some(t)),
    };
    VariableInfo {
        column_id: column.column_id,
        name: column.name.clone(),
        value_type: column.value_type.tag().to_string(),
        do_not_use,
        coordinate_variable: coordinate.is_some(),
        coordinate_variable_type: coordinate.map(|t| t.wire_name().to_string()),
        variable_metadata: column
            .attributes
            .iter()
            .map(|a| VariableAttribute {
                metadata_key: a.name.clone(),
                metadata_value: a.value.clone(),
                metadata_value_type: a.value_type.clone(),
                metadata_group: a.group.clone(),
            })
            .collect(),
    }
}
