//! Writer-independent description of the output dataset.
//!
//! Both the netCDF and the NcML writers render a [`DatasetPlan`], so they
//! agree on dimension names, variable names, shapes and attribute sets.

use tracing::debug;

use crate::{
    attributes::{
        build_attributes, coordinate_defaults, merge_defaults, parse_bool, platform_scalars, ScalarCoordinate,
        TypedAttribute, TypedValue,
    },
    classify::{ClassifiedColumn, Classification},
    config::ServerInfo,
    error::{ConvertError, Result},
    model::{ColumnUsage, CoordinateType, FeatureType, PlatformConstant, ValueType},
    parser::ParsedTable,
    time_assembly::{self, EPOCH_UNITS},
};

pub const CONVENTIONS: &str = "CF-1.6";
pub const SYNTHETIC_TIME: &str = "time";
pub const STATION_ID: &str = "station_id";
pub const AUDIT_VARIABLE: &str = "Rosetta";

/// Names the writer adds on its own, claimed before user columns.
pub fn reserved_names(platform: Option<&PlatformConstant>, synthetic_time: bool) -> Vec<&'static str> {
    let mut out = vec![AUDIT_VARIABLE];
    if synthetic_time {
        out.push(SYNTHETIC_TIME);
    }
    if let Some(p) = platform {
        out.push(STATION_ID);
        if p.latitude.is_some() {
            out.push("latitude");
        }
        if p.longitude.is_some() {
            out.push("longitude");
        }
        if p.altitude.is_some() {
            out.push("altitude");
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    PlatformScalar,
    StationId,
    SyntheticTime,
    Coordinate(CoordinateType),
    TimeComponent,
    Data,
    Audit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Booleans, stored as 0/1 bytes.
    Byte(Vec<i8>),
    Text(Vec<String>),
}

impl VariableData {
    pub fn len(&self) -> usize {
        match self {
            VariableData::Int(v) => v.len(),
            VariableData::Float(v) => v.len(),
            VariableData::Double(v) => v.len(),
            VariableData::Byte(v) => v.len(),
            VariableData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values rendered as text, as NcML `<values>` wants them.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            VariableData::Int(v) => v.iter().map(ToString::to_string).collect(),
            VariableData::Float(v) => v.iter().map(ToString::to_string).collect(),
            VariableData::Double(v) => v.iter().map(ToString::to_string).collect(),
            VariableData::Byte(v) => v.iter().map(ToString::to_string).collect(),
            VariableData::Text(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedVariable {
    pub name: String,
    pub value_type: ValueType,
    /// Dimension names; empty for scalars.
    pub shape: Vec<String>,
    pub attributes: Vec<TypedAttribute>,
    pub role: VariableRole,
    pub data: VariableData,
}

impl PlannedVariable {
    pub fn attribute(&self, name: &str) -> Option<&TypedValue> {
        self.attributes.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPlan {
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<TypedAttribute>,
    /// In write order.
    pub variables: Vec<PlannedVariable>,
}

impl DatasetPlan {
    pub fn variable(&self, name: &str) -> Option<&PlannedVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Everything the plan is assembled from, already validated.
pub struct PlanInput<'a> {
    pub feature_type: FeatureType,
    pub global_attributes: Vec<TypedAttribute>,
    pub platform: Option<&'a PlatformConstant>,
    pub classification: &'a Classification,
    pub table: &'a ParsedTable,
    pub client_payload: &'a str,
    pub server: &'a ServerInfo,
}

pub fn build_plan(input: PlanInput<'_>) -> Result<DatasetPlan> {
    let rows = input.table.row_count();
    let classification = input.classification;
    let row_dim = classification
        .relative_time
        .as_ref()
        .map(|c| c.var_name.clone())
        .unwrap_or_else(|| SYNTHETIC_TIME.to_string());

    let mut plan = DatasetPlan {
        dimensions: vec![Dimension { name: row_dim.clone(), len: rows }],
        attributes: root_attributes(input.feature_type, input.global_attributes),
        variables: Vec::new(),
    };

    // platform scalars and the instance id come first
    let scalars = match input.platform {
        Some(p) => platform_scalars(p)?,
        None => Vec::new(),
    };
    for s in &scalars {
        plan.variables.push(scalar_variable(s));
    }
    if let Some(p) = input.platform {
        plan.variables.push(station_id(p, input.feature_type));
    }

    if classification.needs_synthetic_time() {
        plan.variables.push(synthetic_time(classification, input.table)?);
    }

    let mut coordinates = vec![row_dim.clone()];
    coordinates.extend(
        classification
            .coordinate_names()
            .into_iter()
            .filter(|n| *n != row_dim)
            .map(str::to_string),
    );
    coordinates.extend(scalars.iter().map(|s| s.name.to_string()));
    let coordinates = coordinates.join(" ");

    for column in classification.columns_in_order() {
        let mut attributes =
            build_attributes(&column.var_name, &column.declaration.attributes)?;
        let role = match column.declaration.usage {
            ColumnUsage::Coordinate(t) if t.is_time_component() => {
                attributes.push(TypedAttribute::new("timeRelatedVariable", TypedValue::Boolean(true)));
                attributes.push(TypedAttribute::text("_coordinateVariableType", t.wire_name()));
                VariableRole::TimeComponent
            }
            ColumnUsage::Coordinate(t) => {
                if t == CoordinateType::RelativeTime && !attributes.iter().any(|a| a.name == "units") {
                    return Err(ConvertError::MissingConfiguration(format!(
                        "relative time column '{}' declares no units",
                        column.declaration.name
                    )));
                }
                let defaults = coordinate_defaults(t, &attributes);
                merge_defaults(&mut attributes, defaults);
                VariableRole::Coordinate(t)
            }
            _ => {
                merge_defaults(&mut attributes, vec![TypedAttribute::text("coordinates", &coordinates)]);
                VariableRole::Data
            }
        };
        let column_id = i32::try_from(column.column_id()).map_err(|_| {
            ConvertError::InvalidConfiguration(format!(
                "column id {} of '{}' is out of range",
                column.column_id(),
                column.declaration.name
            ))
        })?;
        attributes.push(TypedAttribute::new("_columnId", TypedValue::Int(column_id)));
        align_fill_values(&column.var_name, &mut attributes, column.declaration.value_type)?;

        let data = column_data(column, input.table, &attributes)?;
        debug!(name = %column.var_name, ?role, "planned variable");
        plan.variables.push(PlannedVariable {
            name: column.var_name.clone(),
            value_type: column.declaration.value_type,
            shape: vec![row_dim.clone()],
            attributes,
            role,
            data,
        });
    }

    plan.variables.push(audit_variable(input.client_payload, input.server));
    Ok(plan)
}

fn root_attributes(feature_type: FeatureType, globals: Vec<TypedAttribute>) -> Vec<TypedAttribute> {
    let mut attrs = vec![
        TypedAttribute::text("Conventions", CONVENTIONS),
        TypedAttribute::text("featureType", feature_type.cf_name()),
    ];
    attrs.extend(
        globals
            .into_iter()
            .filter(|a| a.name != "Conventions" && a.name != "featureType"),
    );
    attrs
}

fn scalar_variable(s: &ScalarCoordinate) -> PlannedVariable {
    PlannedVariable {
        name: s.name.to_string(),
        value_type: ValueType::Float,
        shape: Vec::new(),
        attributes: s.attributes.clone(),
        role: VariableRole::PlatformScalar,
        data: VariableData::Float(vec![s.value]),
    }
}

fn station_id(platform: &PlatformConstant, feature_type: FeatureType) -> PlannedVariable {
    let name = if platform.name.trim().is_empty() { "station" } else { platform.name.trim() };
    PlannedVariable {
        name: STATION_ID.to_string(),
        value_type: ValueType::Text,
        shape: Vec::new(),
        attributes: vec![
            TypedAttribute::text("cf_role", &feature_type.cf_role()),
            TypedAttribute::text("long_name", "station identifier"),
        ],
        role: VariableRole::StationId,
        data: VariableData::Text(vec![name.to_string()]),
    }
}

fn synthetic_time(classification: &Classification, table: &ParsedTable) -> Result<PlannedVariable> {
    let assembled = time_assembly::assemble(&classification.time_components, table)?;
    let (attributes, values) = match assembled {
        Some(values) => (
            vec![
                TypedAttribute::text("standard_name", "time"),
                TypedAttribute::text("long_name", "time"),
                TypedAttribute::text("units", EPOCH_UNITS),
                TypedAttribute::text("calendar", "gregorian"),
                TypedAttribute::text("axis", "T"),
            ],
            values,
        ),
        None => (
            vec![
                TypedAttribute::text("long_name", "row index"),
                TypedAttribute::text("units", "1"),
            ],
            (0..table.row_count()).map(|i| i as f64).collect(),
        ),
    };
    Ok(PlannedVariable {
        name: SYNTHETIC_TIME.to_string(),
        value_type: ValueType::Double,
        shape: vec![SYNTHETIC_TIME.to_string()],
        attributes,
        role: VariableRole::SyntheticTime,
        data: VariableData::Double(values),
    })
}

fn audit_variable(payload: &str, server: &ServerInfo) -> PlannedVariable {
    PlannedVariable {
        name: AUDIT_VARIABLE.to_string(),
        value_type: ValueType::Text,
        shape: Vec::new(),
        attributes: vec![
            TypedAttribute::text("long_name", "conversion request as submitted"),
            TypedAttribute::text("rosetta_version", &server.version),
            TypedAttribute::text("server_id", &server.server_id),
        ],
        role: VariableRole::Audit,
        data: VariableData::Text(vec![payload.to_string()]),
    }
}

fn is_fill(name: &str) -> bool {
    name == "_FillValue" || name == "missing_value"
}

/// `_FillValue` and `missing_value` must share the variable's type. Boolean
/// columns carry neither, text columns no `_FillValue`.
fn align_fill_values(
    var_name: &str,
    attributes: &mut Vec<TypedAttribute>,
    ty: ValueType,
) -> Result<()> {
    attributes.retain(|a| match ty {
        ValueType::Boolean => !is_fill(&a.name),
        ValueType::Text => a.name != "_FillValue",
        _ => true,
    });
    for attr in attributes.iter_mut().filter(|a| is_fill(&a.name)) {
        let target = format!("{var_name}:{}", attr.name);
        attr.value = TypedValue::coerce(&target, &attr.value.to_string(), ty)?;
    }
    Ok(())
}

fn column_data(
    column: &ClassifiedColumn,
    table: &ParsedTable,
    attributes: &[TypedAttribute],
) -> Result<VariableData> {
    let fill = attributes
        .iter()
        .find(|a| is_fill(&a.name))
        .map(|a| a.value.to_string());
    let fill = fill.as_deref();
    let ty = column.declaration.value_type;
    let id = column.column_id();

    let tokens = table.column(id).map(move |(line, raw)| {
        let token = match (raw.trim(), fill) {
            ("", Some(f)) => f,
            (t, _) => t,
        };
        (line, token)
    });

    let bad = |line: usize, raw: &str| ConvertError::Data {
        line: line + 1,
        column: id,
        message: format!("'{raw}' is not a valid {} for '{}'", ty.tag(), column.var_name),
    };

    Ok(match ty {
        ValueType::Text => VariableData::Text(tokens.map(|(_, t)| t.to_string()).collect()),
        ValueType::Integer => VariableData::Int(
            tokens
                .map(|(l, t)| t.parse().map_err(|_| bad(l, t)))
                .collect::<Result<_>>()?,
        ),
        ValueType::Float => VariableData::Float(
            tokens
                .map(|(l, t)| t.parse().map_err(|_| bad(l, t)))
                .collect::<Result<_>>()?,
        ),
        ValueType::Double => VariableData::Double(
            tokens
                .map(|(l, t)| t.parse().map_err(|_| bad(l, t)))
                .collect::<Result<_>>()?,
        ),
        ValueType::Boolean => VariableData::Byte(
            tokens
                .map(|(l, t)| parse_bool(t).map(i8::from).ok_or_else(|| bad(l, t)))
                .collect::<Result<_>>()?,
        ),
    })
}
