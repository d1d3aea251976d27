//! Splits column declarations into coordinate, time-component and data
//! columns and gives each a unique netCDF variable name.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::{
    error::{ConvertError, Result},
    model::{ColumnDeclaration, ColumnUsage, CoordinateType},
};

/// Hands out variable names, adding `_2`, `_3`, ... when a sanitized name
/// repeats. Comparison ignores case so `Water Temp` and `water_temp` collide.
#[derive(Debug, Default)]
pub struct NameRegistry {
    seen: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a name the writer itself needs; later user columns get suffixed.
    pub fn reserve(&mut self, name: &str) {
        *self.seen.entry(name.to_ascii_lowercase()).or_insert(0) += 1;
    }

    pub fn assign(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        let count = self.seen.entry(base.to_ascii_lowercase()).or_insert(0);
        *count += 1;
        let mut n = *count;
        let name = if n == 1 {
            base
        } else {
            // the suffixed name must itself be free
            loop {
                let candidate = format!("{base}_{n}");
                if !self.seen.contains_key(&candidate.to_ascii_lowercase()) {
                    self.seen.insert(candidate.to_ascii_lowercase(), 1);
                    break candidate;
                }
                n += 1;
            }
        };
        name
    }
}

/// Trim, then replace each inner whitespace character with an underscore.
pub fn sanitize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "variable".to_string();
    }
    trimmed
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// A used column with its final variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedColumn {
    pub var_name: String,
    pub declaration: ColumnDeclaration,
}

impl ClassifiedColumn {
    pub fn column_id(&self) -> usize {
        self.declaration.column_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Standalone coordinate columns, at most one per type, including
    /// relative time.
    pub coordinates: BTreeMap<CoordinateType, ClassifiedColumn>,
    /// Date/time pieces to be combined into the derived time variable.
    pub time_components: Vec<ClassifiedColumn>,
    pub data: Vec<ClassifiedColumn>,
    pub relative_time: Option<ClassifiedColumn>,
}

impl Classification {
    pub fn has_relative_time(&self) -> bool {
        self.relative_time.is_some()
    }

    /// Writer needs to fabricate a `time` dimension and variable.
    pub fn needs_synthetic_time(&self) -> bool {
        !self.has_relative_time()
    }

    /// Every used column in declaration (column) order.
    pub fn columns_in_order(&self) -> Vec<&ClassifiedColumn> {
        let mut all: Vec<&ClassifiedColumn> = self
            .coordinates
            .values()
            .chain(self.time_components.iter())
            .chain(self.data.iter())
            .collect();
        all.sort_by_key(|c| c.column_id());
        all
    }

    /// Names of the coordinate variables, in coordinate-type order.
    pub fn coordinate_names(&self) -> Vec<&str> {
        self.coordinates
            .values()
            .map(|c| c.var_name.as_str())
            .collect()
    }
}

pub fn classify(
    declarations: &[ColumnDeclaration],
    names: &mut NameRegistry,
) -> Result<Classification> {
    let mut out = Classification::default();
    let mut ordered: Vec<&ColumnDeclaration> = declarations.iter().collect();
    ordered.sort_by_key(|d| d.column_id);

    for decl in ordered {
        let kind = match decl.usage {
            ColumnUsage::DoNotUse => continue,
            other => other,
        };
        let column = ClassifiedColumn {
            var_name: names.assign(&decl.name),
            declaration: decl.clone(),
        };
        debug!(column = decl.column_id, name = %column.var_name, usage = ?kind, "classified");

        match kind {
            ColumnUsage::Coordinate(t) if t.is_time_component() => {
                out.time_components.push(column);
            }
            ColumnUsage::Coordinate(t) => {
                if let Some(first) = out.coordinates.get(&t) {
                    return Err(ConvertError::InvalidConfiguration(format!(
                        "columns {} and {} are both declared as {t}",
                        first.column_id(),
                        column.column_id()
                    )));
                }
                if t == CoordinateType::RelativeTime {
                    out.relative_time = Some(column.clone());
                }
                out.coordinates.insert(t, column);
            }
            _ => out.data.push(column),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    fn decl(id: usize, name: &str, usage: ColumnUsage) -> ColumnDeclaration {
        ColumnDeclaration {
            column_id: id,
            name: name.to_string(),
            value_type: ValueType::Float,
            usage,
            attributes: Vec::new(),
        }
    }

    #[test]
    fn test_disambiguation_is_case_insensitive() {
        let mut names = NameRegistry::new();
        assert_eq!(names.assign("Water Temp"), "Water_Temp");
        assert_eq!(names.assign("water_temp"), "water_temp_2");
        assert_eq!(names.assign("WATER TEMP"), "WATER_TEMP_3");
    }

    #[test]
    fn test_sanitize_keeps_each_space() {
        assert_eq!(sanitize("  a  b "), "a__b");
        assert_eq!(sanitize("a\tb"), "a_b");
        assert_eq!(sanitize("   "), "variable");
    }

    #[test]
    fn test_suffix_does_not_collide_with_later_column() {
        let mut names = NameRegistry::new();
        assert_eq!(names.assign("temp"), "temp");
        assert_eq!(names.assign("temp"), "temp_2");
        assert_eq!(names.assign("temp_2"), "temp_2_2");

        let mut names = NameRegistry::new();
        assert_eq!(names.assign("temp_2"), "temp_2");
        assert_eq!(names.assign("temp"), "temp");
        assert_eq!(names.assign("temp"), "temp_3");
    }

    #[test]
    fn test_reserved_names() {
        let mut names = NameRegistry::new();
        names.reserve("time");
        assert_eq!(names.assign("time"), "time_2");
    }

    #[test]
    fn test_partition() {
        let decls = vec![
            decl(0, "time", ColumnUsage::Coordinate(CoordinateType::RelativeTime)),
            decl(1, "lat", ColumnUsage::Coordinate(CoordinateType::Latitude)),
            decl(2, "junk", ColumnUsage::DoNotUse),
            decl(3, "temperature", ColumnUsage::Data),
            decl(4, "date", ColumnUsage::Coordinate(CoordinateType::DateOnly)),
        ];
        let c = classify(&decls, &mut NameRegistry::new()).unwrap();
        assert!(c.has_relative_time());
        assert!(!c.needs_synthetic_time());
        assert_eq!(c.coordinates.len(), 2);
        assert_eq!(c.data.len(), 1);
        assert_eq!(c.time_components.len(), 1);
        let order: Vec<_> = c.columns_in_order().iter().map(|c| c.column_id()).collect();
        assert_eq!(order, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_decomposed_time_needs_synthetic_time() {
        let decls = vec![
            decl(0, "date", ColumnUsage::Coordinate(CoordinateType::DateOnly)),
            decl(1, "clock", ColumnUsage::Coordinate(CoordinateType::TimeOnly)),
            decl(2, "temp", ColumnUsage::Data),
        ];
        let c = classify(&decls, &mut NameRegistry::new()).unwrap();
        assert!(c.needs_synthetic_time());
        assert!(c.coordinates.is_empty());
        assert_eq!(c.time_components.len(), 2);
    }

    #[test]
    fn test_two_relative_times_rejected() {
        let decls = vec![
            decl(0, "t1", ColumnUsage::Coordinate(CoordinateType::RelativeTime)),
            decl(1, "t2", ColumnUsage::Coordinate(CoordinateType::RelativeTime)),
        ];
        assert!(matches!(
            classify(&decls, &mut NameRegistry::new()),
            Err(ConvertError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_repeated_coordinate_type_rejected() {
        for ty in [CoordinateType::Latitude, CoordinateType::Longitude, CoordinateType::Vertical] {
            let decls = vec![
                decl(0, "a", ColumnUsage::Coordinate(ty)),
                decl(1, "temp", ColumnUsage::Data),
                decl(2, "b", ColumnUsage::Coordinate(ty)),
            ];
            match classify(&decls, &mut NameRegistry::new()) {
                Err(ConvertError::InvalidConfiguration(msg)) => {
                    assert!(msg.contains("columns 0 and 2"), "{msg}");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_repeated_time_components_allowed() {
        let decls = vec![
            decl(0, "d1", ColumnUsage::Coordinate(CoordinateType::DateOnly)),
            decl(1, "d2", ColumnUsage::Coordinate(CoordinateType::DateOnly)),
        ];
        let c = classify(&decls, &mut NameRegistry::new()).unwrap();
        assert_eq!(c.time_components.len(), 2);
    }
}
