//! Binary netCDF output.
//!
//! [`NetcdfWriter`] is a typestate over the define/write split the format
//! requires: dimensions, variables and attributes can only be declared while
//! `Defining`; `end_define` moves to `Writing`, after which only data can be
//! put; `close` consumes the writer.

use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use ::netcdf::{AttributeValue, FileMut};
use tracing::{debug, info};

use super::{ensure_parent, DatasetWriter};
use crate::{
    attributes::{TypedAttribute, TypedValue},
    error::{ConvertError, Result},
    model::ValueType,
    plan::{DatasetPlan, PlannedVariable, VariableData},
};

/// Header definition phase.
pub struct Defining;
/// Data phase; no further declarations.
pub struct Writing;

pub struct NetcdfWriter<S> {
    file: FileMut,
    path: PathBuf,
    _state: PhantomData<S>,
}

fn nc_err(path: &Path) -> impl FnOnce(::netcdf::Error) -> ConvertError + '_ {
    move |e| ConvertError::netcdf(path, e)
}

/// netCDF has no boolean attribute type; booleans go out as "true"/"false".
fn attribute_value(value: &TypedValue) -> AttributeValue {
    match value {
        TypedValue::Text(s) => AttributeValue::Str(s.clone()),
        TypedValue::Int(v) => AttributeValue::Int(*v),
        TypedValue::Float(v) => AttributeValue::Float(*v),
        TypedValue::Double(v) => AttributeValue::Double(*v),
        TypedValue::Boolean(v) => AttributeValue::Str(v.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Define phase
// ─────────────────────────────────────────────────────────────────────
impl NetcdfWriter<Defining> {
    /// Create the file, and its directory if needed. An existing file is
    /// overwritten.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = ::netcdf::create(path).map_err(nc_err(path))?;
        Ok(NetcdfWriter { file, path: path.to_path_buf(), _state: PhantomData })
    }

    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        self.file.add_dimension(name, len).map_err(nc_err(&self.path))?;
        Ok(())
    }

    pub fn add_global_attribute(&mut self, attr: &TypedAttribute) -> Result<()> {
        self.file
            .add_attribute(&attr.name, attribute_value(&attr.value))
            .map_err(nc_err(&self.path))?;
        Ok(())
    }

    pub fn add_variable(&mut self, var: &PlannedVariable) -> Result<()> {
        let path = &self.path;
        let dims: Vec<&str> = var.shape.iter().map(String::as_str).collect();
        let mut handle = match var.value_type {
            ValueType::Text => self.file.add_string_variable(&var.name, &dims),
            ValueType::Integer => self.file.add_variable::<i32>(&var.name, &dims),
            ValueType::Float => self.file.add_variable::<f32>(&var.name, &dims),
            ValueType::Double => self.file.add_variable::<f64>(&var.name, &dims),
            ValueType::Boolean => self.file.add_variable::<i8>(&var.name, &dims),
        }
        .map_err(nc_err(path))?;

        for attr in &var.attributes {
            handle
                .put_attribute(&attr.name, attribute_value(&attr.value))
                .map_err(nc_err(path))?;
        }
        debug!(name = %var.name, shape = ?var.shape, "declared variable");
        Ok(())
    }

    pub fn end_define(self) -> NetcdfWriter<Writing> {
        NetcdfWriter { file: self.file, path: self.path, _state: PhantomData }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Data phase
// ─────────────────────────────────────────────────────────────────────
impl NetcdfWriter<Writing> {
    pub fn put_data(&mut self, var: &PlannedVariable) -> Result<()> {
        let path = &self.path;
        let mut handle = self.file.variable_mut(&var.name).ok_or_else(|| {
            ConvertError::InvalidConfiguration(format!(
                "variable '{}' was not declared before writing",
                var.name
            ))
        })?;

        match &var.data {
            VariableData::Int(v) => handle.put_values(v.as_slice(), ..),
            VariableData::Float(v) => handle.put_values(v.as_slice(), ..),
            VariableData::Double(v) => handle.put_values(v.as_slice(), ..),
            VariableData::Byte(v) => handle.put_values(v.as_slice(), ..),
            VariableData::Text(v) if var.is_scalar() => match v.first() {
                Some(s) => handle.put_string(s, ..),
                None => Ok(()),
            },
            VariableData::Text(v) => v
                .iter()
                .enumerate()
                .try_for_each(|(i, s)| handle.put_string(s, (i,))),
        }
        .map_err(nc_err(path))
    }

    pub fn close(self) -> PathBuf {
        drop(self.file);
        self.path
    }
}

/// Writes a plan as a netCDF-4 file.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfOutput;

impl DatasetWriter for NetcdfOutput {
    fn extension(&self) -> &'static str {
        "nc"
    }

    fn write(&self, plan: &DatasetPlan, path: &Path) -> Result<()> {
        let mut nc = NetcdfWriter::create(path)?;
        for dim in &plan.dimensions {
            nc.add_dimension(&dim.name, dim.len)?;
        }
        for attr in &plan.attributes {
            nc.add_global_attribute(attr)?;
        }
        for var in &plan.variables {
            nc.add_variable(var)?;
        }

        let mut nc = nc.end_define();
        for var in &plan.variables {
            nc.put_data(var)?;
        }
        let path = nc.close();
        info!(path = %path.display(), variables = plan.variables.len(), "wrote netCDF");
        Ok(())
    }
}
