//! NcML (XML) rendering of a plan.

use std::{fmt::Write as _, fs, path::Path};

use tracing::info;

use super::{ensure_parent, DatasetWriter};
use crate::{
    attributes::{TypedAttribute, TypedValue},
    error::{ConvertError, Result},
    plan::{DatasetPlan, PlannedVariable, VariableData},
};

pub const NCML_NAMESPACE: &str = "http://www.unidata.ucar.edu/namespaces/netcdf/ncml-2.2";

/// Separators tried, in order, for text `<values>`, which may themselves
/// contain spaces. Readers split on single characters.
const TEXT_SEPARATORS: &[char] = &['|', ';', '~', '^', '`', '#', '!', '@', '$'];

/// First separator that occurs in none of the values. Falls back to the
/// private-use area when every candidate is taken.
fn text_separator(values: &[String]) -> char {
    let free = |c: &char| !values.iter().any(|v| v.contains(*c));
    TEXT_SEPARATORS
        .iter()
        .copied()
        .find(free)
        .or_else(|| ('\u{E000}'..='\u{F8FF}').find(free))
        .unwrap_or('|')
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NcmlWriter {
    /// Emit `<values>` for every variable.
    pub include_values: bool,
}

impl NcmlWriter {
    pub fn new(include_values: bool) -> Self {
        NcmlWriter { include_values }
    }

    pub fn render(&self, plan: &DatasetPlan) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(out, "<netcdf xmlns=\"{NCML_NAMESPACE}\">");

        for dim in &plan.dimensions {
            let _ = writeln!(
                out,
                "  <dimension name=\"{}\" length=\"{}\" />",
                escape(&dim.name),
                dim.len
            );
        }
        for attr in &plan.attributes {
            write_attribute(&mut out, "  ", attr);
        }
        for var in &plan.variables {
            self.write_variable(&mut out, var);
        }

        out.push_str("</netcdf>\n");
        out
    }

    fn write_variable(&self, out: &mut String, var: &PlannedVariable) {
        let _ = writeln!(
            out,
            "  <variable name=\"{}\" shape=\"{}\" type=\"{}\">",
            escape(&var.name),
            escape(&var.shape.join(" ")),
            var.value_type.ncml_name()
        );
        for attr in &var.attributes {
            write_attribute(out, "    ", attr);
        }
        if self.include_values && !var.data.is_empty() {
            match &var.data {
                VariableData::Text(v) => {
                    let sep = text_separator(v).to_string();
                    let _ = writeln!(
                        out,
                        "    <values separator=\"{}\">{}</values>",
                        escape(&sep),
                        escape(&v.join(sep.as_str()))
                    );
                }
                other => {
                    let _ = writeln!(out, "    <values>{}</values>", other.to_strings().join(" "));
                }
            }
        }
        out.push_str("  </variable>\n");
    }
}

fn write_attribute(out: &mut String, indent: &str, attr: &TypedAttribute) {
    let ty = match attr.value {
        TypedValue::Int(_) => " type=\"int\"",
        TypedValue::Float(_) => " type=\"float\"",
        TypedValue::Double(_) => " type=\"double\"",
        TypedValue::Text(_) | TypedValue::Boolean(_) => "",
    };
    let _ = writeln!(
        out,
        "{indent}<attribute name=\"{}\"{ty} value=\"{}\" />",
        escape(&attr.name),
        escape(&attr.value.to_string())
    );
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    out
}

impl DatasetWriter for NcmlWriter {
    fn extension(&self) -> &'static str {
        "ncml"
    }

    fn write(&self, plan: &DatasetPlan, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, self.render(plan)).map_err(|e| ConvertError::io(path, e))?;
        info!(path = %path.display(), "wrote NcML");
        Ok(())
    }
}
