//! Survey discovery and lookup.
//!
//! A [`SurveyRegistry`] is built by scanning one directory for coverage maps
//! named `<code>-<band>-DR<release>...fits`. Each file becomes a
//! [`SurveyRecord`] carrying its instrument, limiting magnitude and archive
//! database name. Coverage files are not opened during the build.

use crate::config::RegistryConfig;
use crate::error::{LookupKind, Result, SurveyError};
use crate::metadata::{self, Instrument};
use crate::survey::{ExtensionField, SurveyRecord};
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

const FITS_SUFFIX: &str = ".fits";
const RELEASE_MARKER: &str = "-DR";

static GLOBAL: OnceCell<SurveyRegistry> = OnceCell::new();

/// Build the process-wide registry from `config`.
///
/// # Errors
/// Any build error, or [`SurveyError::Configuration`] if the registry was
/// already initialized.
pub fn initialize(config: &RegistryConfig) -> Result<&'static SurveyRegistry> {
    let registry = SurveyRegistry::build(config)?;
    GLOBAL
        .set(registry)
        .map_err(|_| SurveyError::configuration("survey registry already initialized"))?;
    global()
}

/// The process-wide registry.
///
/// # Errors
/// [`SurveyError::Configuration`] if [`initialize`] has not been called.
pub fn global() -> Result<&'static SurveyRegistry> {
    GLOBAL.get().ok_or_else(|| {
        SurveyError::configuration(
            "survey registry not initialized; call registry::initialize first",
        )
    })
}

/// Ordered collection of known surveys.
#[derive(Debug, Clone)]
pub struct SurveyRegistry {
    data_dir: PathBuf,
    surveys: Vec<SurveyRecord>,
}

impl SurveyRegistry {
    /// Scan `config.data_dir` and build one record per coverage map.
    ///
    /// Files are visited in lexicographic order of their names. The build
    /// stops at the first file that breaks the naming convention or has no
    /// metadata.
    ///
    /// # Errors
    /// - [`SurveyError::Configuration`] if the directory cannot be listed
    /// - [`SurveyError::Format`] for a malformed file name
    /// - [`SurveyError::Lookup`] for an unknown survey code or missing
    ///   limiting magnitude
    pub fn build(config: &RegistryConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        let file_names = coverage_file_names(data_dir)?;

        let mut surveys = Vec::with_capacity(file_names.len());
        for file_name in file_names {
            let record = record_for_file(data_dir, &file_name)?;
            tracing::debug!(
                survey = %record.name(),
                file = %file_name,
                "discovered coverage map"
            );
            if surveys
                .iter()
                .any(|s: &SurveyRecord| s.name() == record.name())
            {
                tracing::warn!(
                    survey = %record.name(),
                    file = %file_name,
                    "duplicate survey name, lookups return the first"
                );
            }
            surveys.push(record);
        }

        tracing::info!(
            data_dir = %data_dir.display(),
            surveys = surveys.len(),
            "built survey registry"
        );
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            surveys,
        })
    }

    /// Shorthand for building from a directory path.
    pub fn from_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::build(&RegistryConfig::with_data_dir(data_dir))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn surveys(&self) -> &[SurveyRecord] {
        &self.surveys
    }

    pub fn len(&self) -> usize {
        self.surveys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty()
    }

    pub fn list_known_survey_names(&self) -> Vec<&str> {
        self.surveys.iter().map(SurveyRecord::name).collect()
    }

    /// # Errors
    /// [`SurveyError::Lookup`] if no survey has this exact name.
    pub fn get_survey_by_name(&self, name: &str) -> Result<&SurveyRecord> {
        self.surveys
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| SurveyError::lookup(LookupKind::Survey, name))
    }

    pub fn surveys_for(&self, instrument: Instrument) -> Vec<&SurveyRecord> {
        self.surveys
            .iter()
            .filter(|s| s.instrument() == instrument)
            .collect()
    }

    /// Surveys observed with the instrument named by `tag` (`"UKIRT"`,
    /// `"vista"`, ...).
    ///
    /// # Errors
    /// [`SurveyError::Lookup`] if `tag` names no instrument.
    pub fn list_known_surveys_for_instrument(&self, tag: &str) -> Result<Vec<&SurveyRecord>> {
        let instrument: Instrument = tag.parse()?;
        Ok(self.surveys_for(instrument))
    }

    pub fn ukirt_surveys(&self) -> Vec<&SurveyRecord> {
        self.surveys_for(Instrument::Ukirt)
    }

    pub fn vista_surveys(&self) -> Vec<&SurveyRecord> {
        self.surveys_for(Instrument::Vista)
    }

    pub fn ukirt_survey_names(&self) -> Vec<&str> {
        self.ukirt_surveys().into_iter().map(SurveyRecord::name).collect()
    }

    pub fn vista_survey_names(&self) -> Vec<&str> {
        self.vista_surveys().into_iter().map(SurveyRecord::name).collect()
    }
}

/// Whether `file_name` matches `*-DR*.fits`, skipping dotfiles the way
/// shell globbing does.
pub fn matches_coverage_pattern(file_name: &str) -> bool {
    if file_name.starts_with('.') {
        return false;
    }
    file_name
        .strip_suffix(FITS_SUFFIX)
        .is_some_and(|stem| stem.contains(RELEASE_MARKER))
}

/// Split a coverage file name into `(survey_code, band)`.
///
/// # Errors
/// [`SurveyError::Format`] unless the name has the form
/// `<code>-<band>-DR<digits>...`.
pub fn parse_coverage_filename(file_name: &str) -> Result<(&str, &str)> {
    let mut tokens = file_name.split('-');
    let (Some(code), Some(band), Some(release)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(SurveyError::format(
            file_name,
            "expected <code>-<band>-DR<release>",
        ));
    };
    if code.is_empty() {
        return Err(SurveyError::format(file_name, "empty survey code"));
    }
    if band.is_empty() {
        return Err(SurveyError::format(file_name, "empty filter band"));
    }
    let has_release = release
        .strip_prefix("DR")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit());
    if !has_release {
        return Err(SurveyError::format(
            file_name,
            format!("release token '{}' is not DR<digits>", release),
        ));
    }
    Ok((code, band))
}

fn coverage_file_names(data_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(data_dir).map_err(|e| {
        SurveyError::configuration(format!(
            "cannot read data directory {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            SurveyError::configuration(format!(
                "cannot read data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;
        let name = entry.file_name().into_string().map_err(|name| {
            SurveyError::format(name.to_string_lossy(), "file name is not valid UTF-8")
        })?;
        if matches_coverage_pattern(&name) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn record_for_file(data_dir: &Path, file_name: &str) -> Result<SurveyRecord> {
    let (code, band) = parse_coverage_filename(file_name)?;
    let instrument = metadata::instrument_of(code)
        .ok_or_else(|| SurveyError::lookup(LookupKind::SurveyCode, code))?;
    let magnitude = metadata::limiting_magnitude(instrument, code, band)?;

    let mut record = SurveyRecord::new(instrument, code, band, data_dir.join(file_name))
        .with_limiting_magnitude(magnitude);
    if let Some(database) = metadata::remote_database_name(instrument, code) {
        record = record.with_extension(ExtensionField::RemoteDatabase, database);
    }
    Ok(record)
}
