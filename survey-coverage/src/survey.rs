//! A single (survey, band) coverage map and its containment query.

use crate::error::{Result, SurveyError};
use crate::metadata::Instrument;
use celestial_moc::Moc;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How a survey footprint is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageType {
    /// HEALPix Multi-Order Coverage map in FITS.
    Moc,
}

/// Optional metadata attached to a record at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExtensionField {
    /// Archive database holding the survey catalogue.
    #[serde(rename = "wfau_dbname")]
    RemoteDatabase,
}

impl ExtensionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteDatabase => "wfau_dbname",
        }
    }
}

/// Angles in degrees, either one value or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Degrees {
    Scalar(f64),
    List(Vec<f64>),
}

impl Degrees {
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::List(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<f64> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::List(values) => values,
        }
    }
}

impl From<f64> for Degrees {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Degrees {
    fn from(values: Vec<f64>) -> Self {
        Self::List(values)
    }
}

impl From<&[f64]> for Degrees {
    fn from(values: &[f64]) -> Self {
        Self::List(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Degrees {
    fn from(values: [f64; N]) -> Self {
        Self::List(values.to_vec())
    }
}

/// One survey footprint in one filter band.
///
/// The coverage file is the only source of geometry. It is decoded on the
/// first query and cached; the cached MOC is never modified, so a record
/// can be queried repeatedly and from several threads.
#[derive(Debug, Clone, Serialize)]
pub struct SurveyRecord {
    name: String,
    instrument: Instrument,
    survey_code: String,
    filter_band: String,
    coverage_type: CoverageType,
    coverage_file: PathBuf,
    limiting_magnitude: Option<f64>,
    extensions: BTreeMap<ExtensionField, String>,
    #[serde(skip)]
    moc: OnceCell<Moc>,
}

impl SurveyRecord {
    /// Create a record named `<INSTRUMENT>-<code>-<band>`.
    pub fn new(
        instrument: Instrument,
        survey_code: impl Into<String>,
        filter_band: impl Into<String>,
        coverage_file: impl Into<PathBuf>,
    ) -> Self {
        let survey_code = survey_code.into();
        let filter_band = filter_band.into();
        Self {
            name: format!("{}-{}-{}", instrument, survey_code, filter_band),
            instrument,
            survey_code,
            filter_band,
            coverage_type: CoverageType::Moc,
            coverage_file: coverage_file.into(),
            limiting_magnitude: None,
            extensions: BTreeMap::new(),
            moc: OnceCell::new(),
        }
    }

    pub fn with_limiting_magnitude(mut self, magnitude: f64) -> Self {
        self.limiting_magnitude = Some(magnitude);
        self
    }

    pub fn with_extension(mut self, field: ExtensionField, value: impl Into<String>) -> Self {
        self.extensions.insert(field, value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn survey_code(&self) -> &str {
        &self.survey_code
    }

    pub fn filter_band(&self) -> &str {
        &self.filter_band
    }

    pub fn coverage_type(&self) -> CoverageType {
        self.coverage_type
    }

    pub fn coverage_file(&self) -> &Path {
        &self.coverage_file
    }

    pub fn limiting_magnitude(&self) -> Option<f64> {
        self.limiting_magnitude
    }

    pub fn extension(&self, field: ExtensionField) -> Option<&str> {
        self.extensions.get(&field).map(String::as_str)
    }

    pub fn extensions(&self) -> &BTreeMap<ExtensionField, String> {
        &self.extensions
    }

    pub fn remote_database_name(&self) -> Option<&str> {
        self.extension(ExtensionField::RemoteDatabase)
    }

    /// The decoded footprint, reading the coverage file on first use.
    ///
    /// A failed decode is not cached; the next call tries again.
    pub fn moc(&self) -> Result<&Moc> {
        self.moc.get_or_try_init(|| {
            tracing::debug!(
                survey = %self.name,
                path = %self.coverage_file.display(),
                "loading coverage"
            );
            Moc::open(&self.coverage_file)
                .map_err(|source| SurveyError::decode(&self.coverage_file, source))
        })
    }

    /// Test whether each (RA, Dec) pair, in degrees, falls in the footprint.
    ///
    /// Scalars are treated as one-element lists. The result has one entry
    /// per coordinate, in input order.
    ///
    /// # Errors
    /// [`SurveyError::InputValidation`] if the lists differ in length or a
    /// coordinate is not finite or has |Dec| > 90; [`SurveyError::Decode`]
    /// if the coverage file cannot be read.
    pub fn contains(
        &self,
        ra_deg: impl Into<Degrees>,
        dec_deg: impl Into<Degrees>,
    ) -> Result<Vec<bool>> {
        let ra = ra_deg.into().into_vec();
        let dec = dec_deg.into().into_vec();
        if ra.len() != dec.len() {
            return Err(SurveyError::input(format!(
                "RA has {} values but Dec has {}",
                ra.len(),
                dec.len()
            )));
        }
        validate_coordinates(&ra, &dec)?;

        let moc = self.moc()?;
        Ok(ra
            .iter()
            .zip(&dec)
            .map(|(&ra, &dec)| moc.contains(ra.rem_euclid(360.0), dec))
            .collect())
    }

    /// Fraction of the sky inside the footprint.
    pub fn sky_fraction(&self) -> Result<f64> {
        Ok(self.moc()?.sky_fraction())
    }
}

fn validate_coordinates(ra: &[f64], dec: &[f64]) -> Result<()> {
    for (i, (&ra, &dec)) in ra.iter().zip(dec).enumerate() {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(SurveyError::input(format!(
                "coordinate {} is not finite: ({}, {})",
                i, ra, dec
            )));
        }
        if dec.abs() > 90.0 {
            return Err(SurveyError::input(format!(
                "coordinate {} has declination {} outside [-90, 90]",
                i, dec
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use celestial_moc::Cell;
    use tempfile::TempDir;

    /// A record whose footprint is HEALPix base face 4, centred on (0, 0).
    fn equatorial_record(dir: &TempDir) -> SurveyRecord {
        let path = dir.path().join("las-J-DR11.fits");
        Moc::from_cells([Cell::new(0, 4).unwrap()])
            .write_fits(&path)
            .unwrap();
        SurveyRecord::new(Instrument::Ukirt, "las", "J", path)
            .with_limiting_magnitude(20.51)
            .with_extension(ExtensionField::RemoteDatabase, "UKIDSSDR11PLUS")
    }

    #[test]
    fn test_name_and_metadata() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert_eq!(record.name(), "UKIRT-las-J");
        assert_eq!(record.survey_code(), "las");
        assert_eq!(record.filter_band(), "J");
        assert_eq!(record.instrument(), Instrument::Ukirt);
        assert_eq!(record.coverage_type(), CoverageType::Moc);
        assert_eq!(record.limiting_magnitude(), Some(20.51));
        assert_eq!(record.remote_database_name(), Some("UKIDSSDR11PLUS"));
        assert_eq!(ExtensionField::RemoteDatabase.as_str(), "wfau_dbname");
    }

    #[test]
    fn test_scalar_contains_returns_one_result() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert_eq!(record.contains(0.0, 0.0).unwrap(), vec![true]);
        assert_eq!(record.contains(180.0, 0.0).unwrap(), vec![false]);
    }

    #[test]
    fn test_list_contains_preserves_order() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        let result = record
            .contains(vec![180.0, 0.0, 10.0, 90.0], vec![0.0, 0.0, -10.0, 0.0])
            .unwrap();
        assert_eq!(result, vec![false, true, true, false]);
    }

    #[test]
    fn test_negative_ra_wraps() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert_eq!(record.contains(-10.0, 5.0).unwrap(), vec![true]);
        assert_eq!(record.contains(350.0, 5.0).unwrap(), vec![true]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        let err = record
            .contains([1.0, 2.0, 3.0], [1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, SurveyError::InputValidation(_)));
    }

    #[test]
    fn test_scalar_against_list_rejected() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert!(record.contains(1.0, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_out_of_range_declination_rejected() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert!(matches!(
            record.contains(0.0, 91.0),
            Err(SurveyError::InputValidation(_))
        ));
        assert!(matches!(
            record.contains(f64::NAN, 0.0),
            Err(SurveyError::InputValidation(_))
        ));
    }

    #[test]
    fn test_empty_lists_give_empty_result() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert!(record.contains(Vec::<f64>::new(), Vec::<f64>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_repeated_queries_agree() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        let ra = vec![0.0, 45.0, 100.0, 300.0];
        let dec = vec![0.0, 30.0, -20.0, 10.0];
        let first = record.contains(ra.clone(), dec.clone()).unwrap();
        let second = record.contains(ra, dec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let record =
            SurveyRecord::new(Instrument::Vista, "vvv", "Y", "/nonexistent/vvv-Y-DR5.fits");
        let err = record.contains(0.0, 0.0).unwrap_err();
        assert!(matches!(err, SurveyError::Decode { .. }));
        assert!(record.moc().is_err());
    }

    #[test]
    fn test_invalid_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vvv-Y-DR5.fits");
        std::fs::write(&path, b"SIMPLE").unwrap();
        let record = SurveyRecord::new(Instrument::Vista, "vvv", "Y", path);
        assert!(matches!(
            record.contains(0.0, 0.0),
            Err(SurveyError::Decode { .. })
        ));
    }

    #[test]
    fn test_sky_fraction() {
        let dir = TempDir::new().unwrap();
        let record = equatorial_record(&dir);
        assert!((record.sky_fraction().unwrap() - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SurveyRecord>();
    }
}
