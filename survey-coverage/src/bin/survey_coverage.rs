use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use survey_coverage::registry::{self, SurveyRegistry};
use survey_coverage::{PlotOptions, RegistryConfig, StyleOptions, SurveyRecord};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "survey-coverage")]
#[command(about = "Look up UKIRT/VISTA survey footprints and test sky positions against them")]
struct Cli {
    /// Directory holding <code>-<band>-DR<n>.fits coverage maps
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log registry and coverage loading at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known surveys
    List {
        /// Only surveys from this instrument (UKIRT or VISTA)
        #[arg(long)]
        instrument: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show metadata and coverage statistics for one survey
    Info {
        /// Survey name, e.g. UKIRT-las-J
        name: String,
    },
    /// Test whether sky positions fall inside a survey footprint
    Contains {
        /// Survey name, e.g. UKIRT-las-J
        name: String,
        /// Right ascension in degrees, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        ra: Vec<f64>,
        /// Declination in degrees, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        dec: Vec<f64>,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Draw a survey footprint on an all-sky Aitoff map (SVG)
    Plot {
        /// Survey name, e.g. UKIRT-las-J
        name: String,
        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,
        /// Do not outline the footprint
        #[arg(long)]
        no_border: bool,
        /// Do not outline the projection boundary
        #[arg(long)]
        no_frame: bool,
        /// Fill style override, key=value (color, alpha, linewidth, filled)
        #[arg(long = "style", value_name = "KEY=VALUE")]
        style: Vec<String>,
        /// Border style override, key=value
        #[arg(long = "border-style", value_name = "KEY=VALUE")]
        border_style: Vec<String>,
    },
    /// Copy HPXMOC from the primary header into MOCORDER of the MOC table
    FixHeader {
        /// Coverage file to read
        source: PathBuf,
        /// File to write (overwritten if present)
        destination: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.data_dir {
        Some(dir) => RegistryConfig::with_data_dir(dir),
        None => RegistryConfig::from_env(),
    };

    match cli.command {
        Commands::List { instrument, format } => {
            let registry = open_registry(&config)?;
            let surveys = match instrument {
                Some(tag) => registry.list_known_surveys_for_instrument(&tag)?,
                None => registry.surveys().iter().collect(),
            };
            match format {
                OutputFormat::Table => print_table(&surveys),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&surveys)?),
                OutputFormat::Csv => print_csv(&surveys),
            }
        }
        Commands::Info { name } => {
            let registry = open_registry(&config)?;
            let survey = registry.get_survey_by_name(&name)?;
            print_info(survey)?;
        }
        Commands::Contains {
            name,
            ra,
            dec,
            format,
        } => {
            let registry = open_registry(&config)?;
            let survey = registry.get_survey_by_name(&name)?;
            let inside = survey.contains(ra.clone(), dec.clone())?;
            print_containment(&ra, &dec, &inside, format)?;
        }
        Commands::Plot {
            name,
            output,
            no_border,
            no_frame,
            style,
            border_style,
        } => {
            let registry = open_registry(&config)?;
            let survey = registry.get_survey_by_name(&name)?;
            let options = PlotOptions {
                style: apply_styles(StyleOptions::fill(), &style)?,
                border: if no_border {
                    None
                } else {
                    Some(apply_styles(StyleOptions::border(), &border_style)?)
                },
                frame: !no_frame,
                ..PlotOptions::default()
            };
            survey.plot_coverage_svg(&output, &options)?;
            println!("{}", output.display());
        }
        Commands::FixHeader {
            source,
            destination,
        } => {
            let written = celestial_moc::fix_header(&source, &destination)
                .with_context(|| format!("fixing header of {}", source.display()))?;
            println!("{}", written.display());
        }
    }

    Ok(())
}

fn open_registry(config: &RegistryConfig) -> anyhow::Result<&'static SurveyRegistry> {
    registry::initialize(config)
        .with_context(|| format!("loading surveys from {}", config.data_dir().display()))
}

fn apply_styles(base: StyleOptions, assignments: &[String]) -> anyhow::Result<StyleOptions> {
    let mut style = base;
    for assignment in assignments {
        style = style.with_assignment(assignment)?;
    }
    Ok(style)
}

fn print_table(surveys: &[&SurveyRecord]) {
    for survey in surveys {
        println!(
            "{:<16} {:<6} {:<7} {:<3} {:>7} {}",
            survey.name(),
            survey.instrument(),
            survey.survey_code(),
            survey.filter_band(),
            format_magnitude(survey.limiting_magnitude()),
            survey.remote_database_name().unwrap_or("-"),
        );
    }
    if surveys.is_empty() {
        println!("No surveys found.");
    } else {
        println!("\nTotal surveys: {}", surveys.len());
    }
}

fn print_csv(surveys: &[&SurveyRecord]) {
    println!(
        "name,instrument,survey_code,filter_band,limiting_magnitude,wfau_dbname,coverage_file"
    );
    for survey in surveys {
        println!(
            "{},{},{},{},{},{},{}",
            survey.name(),
            survey.instrument(),
            survey.survey_code(),
            survey.filter_band(),
            survey
                .limiting_magnitude()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            survey.remote_database_name().unwrap_or(""),
            survey.coverage_file().display(),
        );
    }
}

fn print_info(survey: &SurveyRecord) -> anyhow::Result<()> {
    let moc = survey.moc()?;
    println!("Name:               {}", survey.name());
    println!("Instrument:         {}", survey.instrument());
    println!("Survey code:        {}", survey.survey_code());
    println!("Filter band:        {}", survey.filter_band());
    println!(
        "Limiting magnitude: {}",
        format_magnitude(survey.limiting_magnitude())
    );
    println!(
        "Database:           {}",
        survey.remote_database_name().unwrap_or("-")
    );
    println!("Coverage file:      {}", survey.coverage_file().display());
    println!("MOC depth:          {}", moc.depth());
    println!(
        "Sky fraction:       {:.6} ({:.1} deg^2)",
        moc.sky_fraction(),
        moc.sky_fraction() * FULL_SKY_DEG2
    );
    Ok(())
}

/// 4 pi steradians in square degrees.
const FULL_SKY_DEG2: f64 = 41_252.961_249_419_27;

#[derive(serde::Serialize)]
struct JsonContainment {
    ra_deg: f64,
    dec_deg: f64,
    inside: bool,
}

fn print_containment(
    ra: &[f64],
    dec: &[f64],
    inside: &[bool],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            for ((ra, dec), inside) in ra.iter().zip(dec).zip(inside) {
                println!("RA={:.6}° Dec={:+.6}° Inside={}", ra, dec, inside);
            }
        }
        OutputFormat::Json => {
            let rows: Vec<JsonContainment> = ra
                .iter()
                .zip(dec)
                .zip(inside)
                .map(|((&ra_deg, &dec_deg), &inside)| JsonContainment {
                    ra_deg,
                    dec_deg,
                    inside,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Csv => {
            println!("ra_deg,dec_deg,inside");
            for ((ra, dec), inside) in ra.iter().zip(dec).zip(inside) {
                println!("{},{},{}", ra, dec, inside);
            }
        }
    }
    Ok(())
}

fn format_magnitude(magnitude: Option<f64>) -> String {
    magnitude.map_or_else(|| "-".to_string(), |m| format!("{:.2}", m))
}
