//! Registry of UKIRT and VISTA near-infrared survey footprints.
//!
//! Coverage maps are HEALPix MOC FITS files named
//! `<code>-<band>-DR<release>.fits` in a data directory. Building a
//! [`SurveyRegistry`] scans that directory, attaches compiled-in metadata
//! (instrument, limiting magnitude, archive database) and yields one
//! [`SurveyRecord`] per map. Records answer point-in-footprint queries and
//! draw their footprint on an all-sky Aitoff map.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`metadata`] | [`Instrument`], limiting magnitudes, database names |
//! | [`registry`] | [`SurveyRegistry`] build and lookups, process-wide registry |
//! | [`survey`] | [`SurveyRecord`] and [`contains`](SurveyRecord::contains) |
//! | [`plot`] | [`plot_coverage`](SurveyRecord::plot_coverage) and style options |
//! | [`wcs`] | [`SkyProjection`], the default all-sky frame |
//! | [`config`] | [`RegistryConfig`] data directory settings |
//!
//! # Quick Start
//!
//! ```ignore
//! use survey_coverage::{RegistryConfig, SurveyRegistry};
//!
//! let registry = SurveyRegistry::build(&RegistryConfig::from_env())?;
//! let las = registry.get_survey_by_name("UKIRT-las-J")?;
//! let inside = las.contains(vec![150.1, 10.0], vec![2.2, -80.0])?;
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod plot;
pub mod registry;
pub mod survey;
pub mod wcs;

pub use config::RegistryConfig;
pub use error::{LookupKind, Result, SurveyError};
pub use metadata::Instrument;
pub use plot::{PlotOptions, StyleOptions};
pub use registry::SurveyRegistry;
pub use survey::{CoverageType, Degrees, ExtensionField, SurveyRecord};
pub use wcs::SkyProjection;
