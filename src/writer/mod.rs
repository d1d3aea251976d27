//! Renderers for a [`DatasetPlan`](crate::plan::DatasetPlan).

use std::{fs, path::Path};

use crate::{
    error::{ConvertError, Result},
    plan::DatasetPlan,
};

pub mod ncml;
pub mod binary;

pub use self::ncml::NcmlWriter;
pub use self::binary::{Defining, NetcdfOutput, NetcdfWriter, Writing};

/// Something that can materialize a plan as a file.
pub trait DatasetWriter {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn write(&self, plan: &DatasetPlan, path: &Path) -> Result<()>;
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))
        }
        _ => Ok(()),
    }
}
