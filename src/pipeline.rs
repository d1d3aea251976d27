//! One conversion transaction, end to end.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::Utc;
use tracing::{info, info_span};

use crate::{
    attributes::build_attributes,
    classify::{classify, NameRegistry},
    config::RosettaConfig,
    error::{ConvertError, Result},
    model::{ColumnDeclaration, ColumnUsage, CoordinateType},
    parser::{parse_file, ParseOptions},
    plan::{build_plan, reserved_names, DatasetPlan, PlanInput},
    template::{Template, TemplateParts},
    writer::{DatasetWriter, NcmlWriter, NetcdfOutput},
};

/// A fresh id per transaction, used as the output directory name.
pub fn new_transaction_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S%6f").to_string()
}

#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub transaction_id: String,
    pub data_file: PathBuf,
    pub template: Template,
    /// The submission exactly as the client sent it, kept for audit.
    pub client_payload: String,
}

impl ConversionRequest {
    /// Build a request from a template file; the file's text is the payload.
    pub fn from_template_file(
        data_file: &Path,
        template_path: &Path,
        transaction_id: Option<String>,
    ) -> Result<Self> {
        let payload =
            fs::read_to_string(template_path).map_err(|e| ConvertError::io(template_path, e))?;
        Ok(ConversionRequest {
            transaction_id: transaction_id.unwrap_or_else(new_transaction_id),
            data_file: data_file.to_path_buf(),
            template: Template::from_json(&payload)?,
            client_payload: payload,
        })
    }

    /// Output file stem, taken from the data file name.
    pub fn stem(&self) -> String {
        self.data_file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("rosetta")
            .to_string()
    }
}

/// Columns every data row must have: one past the highest declared id. Ids
/// must also fit the `_columnId` attribute.
fn column_count(declarations: &[ColumnDeclaration]) -> Result<usize> {
    let highest = declarations.iter().map(|d| d.column_id).max().unwrap_or(0);
    i32::try_from(highest)
        .ok()
        .and_then(|_| highest.checked_add(1))
        .ok_or_else(|| {
            ConvertError::InvalidConfiguration(format!("column id {highest} is out of range"))
        })
}

/// Parsed, classified and planned; nothing written yet.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    pub transaction_id: String,
    pub stem: String,
    pub template: Template,
    pub plan: DatasetPlan,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub transaction_id: String,
    pub netcdf: PathBuf,
    pub ncml: Option<PathBuf>,
    pub template: PathBuf,
    pub rows: usize,
}

pub struct Converter {
    config: RosettaConfig,
}

impl Converter {
    pub fn new(config: RosettaConfig) -> Self {
        Converter { config }
    }

    /// Validate, parse, classify and plan. Configuration problems surface
    /// here, before any output is created.
    pub fn prepare(&self, req: &ConversionRequest) -> Result<PreparedConversion> {
        let span = info_span!("prepare", transaction = %req.transaction_id);
        let _enter = span.enter();
        let t0 = Instant::now();

        let template = &req.template;
        let feature_type = template.feature_type()?;
        let declarations = template.column_declarations()?;
        if declarations.is_empty() {
            return Err(ConvertError::MissingConfiguration(
                "no column declarations".to_string(),
            ));
        }
        let global_entries = template.global_entries();
        let global_attributes = build_attributes("global", &global_entries)?;
        let platform = template.platform_constant();
        let delimiter = template.delimiter();

        let opts = ParseOptions::new(delimiter.clone())
            .with_headers(template.header_line_numbers.iter().copied())
            .with_columns(column_count(&declarations)?);
        let table = parse_file(&req.data_file, &opts)?;

        let has_relative_time = declarations
            .iter()
            .any(|d| d.usage == ColumnUsage::Coordinate(CoordinateType::RelativeTime));
        let mut names = NameRegistry::new();
        for reserved in reserved_names(platform.as_ref(), !has_relative_time) {
            names.reserve(reserved);
        }
        let classification = classify(&declarations, &mut names)?;

        let plan = build_plan(PlanInput {
            feature_type,
            global_attributes,
            platform: platform.as_ref(),
            classification: &classification,
            table: &table,
            client_payload: &req.client_payload,
            server: &self.config.server,
        })?;

        info!(
            rows = table.row_count(),
            variables = plan.variables.len(),
            synthetic_time = classification.needs_synthetic_time(),
            elapsed = ?t0.elapsed(),
            "conversion planned"
        );
        Ok(PreparedConversion {
            transaction_id: req.transaction_id.clone(),
            stem: req.stem(),
            template: Template::from_parts(
                TemplateParts {
                    delimiter: &delimiter,
                    header_lines: &template.header_line_numbers,
                    feature_type: Some(feature_type),
                    community: template.community.as_deref(),
                    platform_name: template.platform.as_deref(),
                    platform: platform.as_ref(),
                    globals: &global_entries,
                    columns: &declarations,
                },
                &self.config.server,
            ),
            plan,
            rows: table.row_count(),
        })
    }

    /// Write every output of a prepared conversion into its transaction
    /// directory. Files already written stay if a later step fails.
    pub fn write(&self, prepared: &PreparedConversion) -> Result<ConversionOutput> {
        let span = info_span!("write", transaction = %prepared.transaction_id);
        let _enter = span.enter();

        let dir = self.config.transaction_dir(&prepared.transaction_id);
        fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;

        let netcdf_writer = NetcdfOutput;
        let netcdf = dir.join(format!("{}.{}", prepared.stem, netcdf_writer.extension()));
        netcdf_writer.write(&prepared.plan, &netcdf)?;

        let ncml = if self.config.write_ncml {
            let writer = NcmlWriter::new(self.config.ncml_values);
            let path = dir.join(format!("{}.{}", prepared.stem, writer.extension()));
            writer.write(&prepared.plan, &path)?;
            Some(path)
        } else {
            None
        };

        let template = dir.join(format!("{}.template.json", prepared.stem));
        prepared.template.save(&template)?;

        Ok(ConversionOutput {
            transaction_id: prepared.transaction_id.clone(),
            netcdf,
            ncml,
            template,
            rows: prepared.rows,
        })
    }

    pub fn convert(&self, req: &ConversionRequest) -> Result<ConversionOutput> {
        let prepared = self.prepare(req)?;
        self.write(&prepared)
    }
}
