//! Rosetta: delimited ASCII data files → CF-1.6 discrete sampling geometry
//! netCDF.
//!
//! A conversion runs `parser → classify → attributes → plan → writer`, once
//! per transaction:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rosetta_convert::{ConversionRequest, Converter, RosettaConfig};
//!
//! let req = ConversionRequest::from_template_file(
//!     "buoy.csv".as_ref(),
//!     "buoy.template.json".as_ref(),
//!     None,
//! )?;
//! let out = Converter::new(RosettaConfig::default()).convert(&req)?;
//! println!("{}", out.netcdf.display());
//! # Ok(()) }
//! ```

pub mod attributes;
pub mod classify;
pub mod config;
pub mod delimiter;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod template;
pub mod time_assembly;
pub mod writer;

pub use config::{RosettaConfig, ServerInfo};
pub use delimiter::Delimiter;
pub use error::{ConvertError, Result};
pub use pipeline::{ConversionOutput, ConversionRequest, Converter, PreparedConversion};
pub use template::Template;
