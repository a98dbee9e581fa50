use celestial_moc::{fits, Cell, Moc};
use std::fs;
use std::path::Path;
use survey_coverage::{
    Instrument, LookupKind, PlotOptions, RegistryConfig, SurveyError, SurveyRegistry,
};
use tempfile::TempDir;

/// Footprint around (0, 0): equatorial base cell 4.
fn equatorial_moc() -> Moc {
    Moc::from_cells([Cell::new(0, 4).unwrap()])
}

/// Southern footprint centred near (45, -42): the four order-1 children of
/// base cell 8.
fn southern_moc() -> Moc {
    Moc::from_cells((32..36).map(|ipix| Cell::new(1, ipix).unwrap()))
}

fn write_moc(dir: &Path, name: &str, moc: &Moc) {
    moc.write_fits(dir.join(name)).unwrap();
}

fn two_survey_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_moc(dir.path(), "las-J-DR11.fits", &equatorial_moc());
    write_moc(dir.path(), "vvv-Y-DR5.fits", &southern_moc());
    dir
}

#[test]
fn test_two_maps_give_exactly_two_records() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::build(&RegistryConfig::with_data_dir(dir.path())).unwrap();

    assert_eq!(
        registry.list_known_survey_names(),
        vec!["UKIRT-las-J", "VISTA-vvv-Y"]
    );
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();
    assert_eq!(las.limiting_magnitude(), Some(20.51));
    assert_eq!(las.instrument(), Instrument::Ukirt);
    let vvv = registry.get_survey_by_name("VISTA-vvv-Y").unwrap();
    assert_eq!(vvv.limiting_magnitude(), Some(21.2));
    assert_eq!(vvv.instrument(), Instrument::Vista);
}

#[test]
fn test_every_name_round_trips() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    for name in registry.list_known_survey_names() {
        assert_eq!(registry.get_survey_by_name(name).unwrap().name(), name);
    }
}

#[test]
fn test_unknown_name_is_lookup_error() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let err = registry.get_survey_by_name("not-a-real-survey").unwrap_err();
    assert!(matches!(
        err,
        SurveyError::Lookup {
            kind: LookupKind::Survey,
            ..
        }
    ));
    assert!(err.to_string().contains("not-a-real-survey"));
}

#[test]
fn test_instrument_views_partition_registry() {
    let dir = two_survey_dir();
    write_moc(dir.path(), "gps-H-DR11.fits", &southern_moc());
    write_moc(dir.path(), "vhs-J-DR6.fits", &equatorial_moc());
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();

    let ukirt = registry.ukirt_survey_names();
    let vista = registry.vista_survey_names();
    assert!(ukirt.iter().all(|n| n.starts_with("UKIRT-")));
    assert!(vista.iter().all(|n| n.starts_with("VISTA-")));

    let mut union: Vec<&str> = ukirt.into_iter().chain(vista).collect();
    union.sort_unstable();
    let mut all = registry.list_known_survey_names();
    all.sort_unstable();
    assert_eq!(union, all);

    let by_tag = registry.list_known_surveys_for_instrument("UKIRT").unwrap();
    assert_eq!(by_tag.len(), 2);
}

#[test]
fn test_unknown_survey_code_aborts_build() {
    let dir = TempDir::new().unwrap();
    write_moc(dir.path(), "las-J-DR11.fits", &equatorial_moc());
    write_moc(dir.path(), "zzz-J-DR1.fits", &equatorial_moc());
    let err = SurveyRegistry::from_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        SurveyError::Lookup {
            kind: LookupKind::SurveyCode,
            ..
        }
    ));
}

#[test]
fn test_malformed_filename_is_format_error() {
    let dir = TempDir::new().unwrap();
    write_moc(dir.path(), "las-DR11.fits", &equatorial_moc());
    let err = SurveyRegistry::from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, SurveyError::Format { .. }));
}

#[test]
fn test_missing_directory_is_configuration_error() {
    let err = SurveyRegistry::from_dir("/nonexistent/survey-coverage-data").unwrap_err();
    assert!(matches!(err, SurveyError::Configuration { .. }));
}

#[test]
fn test_scalar_and_list_containment() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();

    assert_eq!(las.contains(10.0, 5.0).unwrap(), vec![true]);

    let ra = vec![10.0, 180.0, 350.0, 90.0, 0.0];
    let dec = vec![5.0, 0.0, -5.0, 0.0, 80.0];
    let inside = las.contains(ra.clone(), dec.clone()).unwrap();
    assert_eq!(inside, vec![true, false, true, false, false]);
    assert_eq!(las.contains(ra, dec).unwrap(), inside);

    let vvv = registry.get_survey_by_name("VISTA-vvv-Y").unwrap();
    assert_eq!(
        vvv.contains([45.0, 45.0], [-60.0, 60.0]).unwrap(),
        vec![true, false]
    );
}

#[test]
fn test_length_mismatch_is_input_error() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();
    let err = las.contains([1.0, 2.0, 3.0], [1.0, 2.0]).unwrap_err();
    assert!(matches!(err, SurveyError::InputValidation(_)));
}

#[test]
fn test_corrupt_coverage_file_is_decode_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("las-J-DR11.fits"), b"not a fits file").unwrap();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();
    assert!(matches!(
        las.contains(0.0, 0.0),
        Err(SurveyError::Decode { .. })
    ));
}

#[test]
fn test_oversized_table_dimensions_are_decode_error() {
    let dir = TempDir::new().unwrap();
    let bytes = equatorial_moc().to_fits_bytes();
    let hdus = fits::read_hdus(&bytes).unwrap();
    let mut table = hdus[1].header.clone();
    table.set("GCOUNT", 1i64 << 62);
    fs::write(
        dir.path().join("las-J-DR11.fits"),
        fits::write_hdus([(&hdus[0].header, hdus[0].data), (&table, hdus[1].data)]),
    )
    .unwrap();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();
    assert!(matches!(
        las.contains(0.0, 0.0),
        Err(SurveyError::Decode { .. })
    ));
}

#[test]
fn test_header_fixed_file_is_queryable() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("raw.fits");
    let bytes = equatorial_moc().to_fits_bytes();
    let hdus = fits::read_hdus(&bytes).unwrap();
    let mut primary = hdus[0].header.clone();
    primary.set("HPXMOC", 3i64);
    let mut table = hdus[1].header.clone();
    table.set("MOCORDER", 0i64);
    fs::write(
        &source,
        fits::write_hdus([(&primary, hdus[0].data), (&table, hdus[1].data)]),
    )
    .unwrap();
    let fixed = celestial_moc::fix_header(&source, dir.path().join("las-J-DR11.fits")).unwrap();
    assert!(fixed.exists());

    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    assert_eq!(registry.list_known_survey_names(), vec!["UKIRT-las-J"]);
    let las = registry.get_survey_by_name("UKIRT-las-J").unwrap();
    assert_eq!(las.moc().unwrap().depth(), 3);
    assert_eq!(las.contains(0.0, 0.0).unwrap(), vec![true]);
}

#[test]
fn test_plot_from_registry() {
    let dir = two_survey_dir();
    let registry = SurveyRegistry::from_dir(dir.path()).unwrap();
    let vvv = registry.get_survey_by_name("VISTA-vvv-Y").unwrap();
    let output = dir.path().join("vvv.svg");
    vvv.plot_coverage_svg(&output, &PlotOptions::default()).unwrap();
    let svg = fs::read_to_string(&output).unwrap();
    assert!(svg.contains("<rect"));
}
