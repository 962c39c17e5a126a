//! Vitalsum CLI - Command-line interface for the Vitalsum engine
//!
//! Commands:
//! - summarize: Resolve a health summary from a fixture document
//! - report: Resolve a summary and derive the insight report
//! - validate: Validate a fixture document and its records
//! - doctor: Diagnose engine health and fixture configuration
//! - schema: Print wire-format reference

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;

use vitalsum::pipeline::{validate_sample, SummaryBridge, DEFAULT_REQUEST_BUDGET_MS};
use vitalsum::provider::{FixtureProvider, HealthDataProvider};
use vitalsum::{whole_summary_fallback, ProviderError, RecordKind, ENGINE_NAME, ENGINE_VERSION};

/// Vitalsum - On-device health summary engine
#[derive(Parser)]
#[command(name = "vitalsum")]
#[command(author = "Vitalsum Maintainers")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Aggregate health records into a daily summary", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a health summary from a fixture document
    Summarize {
        /// Fixture file path (use - for stdin)
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Use the built-in demo fixture instead of a file
        #[arg(long)]
        demo: bool,

        /// Request budget in milliseconds (0 disables the deadline)
        #[arg(long, default_value_t = DEFAULT_REQUEST_BUDGET_MS)]
        budget_ms: i64,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Resolve a summary and derive the insight report
    Report {
        /// Fixture file path (use - for stdin)
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Use the built-in demo fixture instead of a file
        #[arg(long)]
        demo: bool,

        /// Request budget in milliseconds (0 disables the deadline)
        #[arg(long, default_value_t = DEFAULT_REQUEST_BUDGET_MS)]
        budget_ms: i64,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Validate a fixture document and its records
    Validate {
        /// Fixture file path (use - for stdin)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and fixture configuration
    Doctor {
        /// Check a fixture file
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print wire-format reference
    Schema {
        /// Document to describe
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Fixture document accepted by summarize/report/validate
    Fixture,
    /// The summary response object
    Summary,
    /// The insight report object
    Report,
}

fn main() -> ExitCode {
    init_diagnostics();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Route library diagnostics to stderr; stdout stays machine-readable.
fn init_diagnostics() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), VitalsumCliError> {
    match cli.command {
        Commands::Summarize {
            fixture,
            demo,
            budget_ms,
            format,
        } => cmd_summarize(fixture.as_deref(), demo, budget_ms, format),

        Commands::Report {
            fixture,
            demo,
            budget_ms,
            format,
        } => cmd_report(fixture.as_deref(), demo, budget_ms, format),

        Commands::Validate { fixture, json } => cmd_validate(&fixture, json),

        Commands::Doctor { fixture, json } => cmd_doctor(fixture.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn read_input(path: &Path) -> Result<String, VitalsumCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_provider(
    fixture: Option<&Path>,
    demo: bool,
) -> Result<FixtureProvider, VitalsumCliError> {
    match fixture {
        Some(path) => {
            let document = read_input(path)?;
            Ok(FixtureProvider::from_json(&document)?)
        }
        None if demo => Ok(FixtureProvider::demo(Utc::now())),
        None => Err(VitalsumCliError::NoInput),
    }
}

fn render<T: serde::Serialize>(value: &T, format: &OutputFormat) -> Result<String, VitalsumCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn cmd_summarize(
    fixture: Option<&Path>,
    demo: bool,
    budget_ms: i64,
    format: OutputFormat,
) -> Result<(), VitalsumCliError> {
    let provider = load_provider(fixture, demo)?;
    let bridge = SummaryBridge::with_budget_ms(Box::new(provider), budget_ms);

    let summary = bridge.summary();
    println!("{}", render(&summary, &format)?);

    Ok(())
}

fn cmd_report(
    fixture: Option<&Path>,
    demo: bool,
    budget_ms: i64,
    format: OutputFormat,
) -> Result<(), VitalsumCliError> {
    let provider = load_provider(fixture, demo)?;
    let bridge = SummaryBridge::with_budget_ms(Box::new(provider), budget_ms);

    let report = bridge.report();
    println!("{}", render(&report, &format)?);

    Ok(())
}

fn cmd_validate(fixture: &Path, json: bool) -> Result<(), VitalsumCliError> {
    let document = read_input(fixture)?;
    let provider = FixtureProvider::from_json(&document)?;

    let samples = provider.samples();
    let errors: Vec<RecordErrorDetail> = samples
        .iter()
        .enumerate()
        .filter_map(|(index, sample)| {
            validate_sample(sample.kind(), sample)
                .err()
                .map(|e| RecordErrorDetail {
                    index,
                    kind: sample.kind().to_string(),
                    error: e.to_string(),
                })
        })
        .collect();

    let report = ValidationReport {
        total_records: samples.len(),
        valid_records: samples.len() - errors.len(),
        invalid_records: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {} ({}): {}", err.index, err.kind, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(VitalsumCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(fixture: Option<&Path>, json: bool) -> Result<(), VitalsumCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    // Check engine version
    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Vitalsum version {}", ENGINE_VERSION),
    });

    // Check the fallback constant serializes
    match serde_json::to_string(&whole_summary_fallback()) {
        Ok(payload) => checks.push(DoctorCheck {
            name: "fallback_summary".to_string(),
            status: CheckStatus::Ok,
            message: format!("Fallback summary serializes ({} bytes)", payload.len()),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "fallback_summary".to_string(),
            status: CheckStatus::Error,
            message: format!("Fallback summary failed to serialize: {}", e),
        }),
    }

    // Check fixture file if provided
    if let Some(fixture_path) = fixture {
        if fixture_path.exists() {
            match fs::read_to_string(fixture_path) {
                Ok(document) => match FixtureProvider::from_json(&document) {
                    Ok(provider) => {
                        let granted = provider.granted_permissions().len();
                        checks.push(DoctorCheck {
                            name: "fixture".to_string(),
                            status: CheckStatus::Ok,
                            message: format!(
                                "Fixture valid ({} records, {}/{} kinds granted)",
                                provider.samples().len(),
                                granted,
                                RecordKind::ALL.len()
                            ),
                        });

                        // Dry-run one request against the fixture
                        let bridge = SummaryBridge::new(Box::new(provider));
                        match bridge.try_summary() {
                            Ok(_) => checks.push(DoctorCheck {
                                name: "dry_run".to_string(),
                                status: CheckStatus::Ok,
                                message: format!(
                                    "Dry-run request against the {} provider resolved a real summary",
                                    bridge.provider_name()
                                ),
                            }),
                            Err(cause) => checks.push(DoctorCheck {
                                name: "dry_run".to_string(),
                                status: CheckStatus::Warning,
                                message: format!("Dry-run request fell back: {}", cause),
                            }),
                        }
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "fixture".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid fixture document: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "fixture".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read fixture file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "fixture".to_string(),
                status: CheckStatus::Warning,
                message: "Fixture file does not exist".to_string(),
            });
        }
    }

    // Check stdin mode
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (fixture streaming ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        engine: ENGINE_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitalsum Doctor Report");
        println!("======================");
        println!("Engine:  {}", report.engine);
        println!("Version: {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VitalsumCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), VitalsumCliError> {
    match schema_type {
        SchemaType::Fixture => {
            if json_schema {
                println!("{}", get_fixture_json_schema());
            } else {
                println!("Fixture Document");
                println!();
                println!("Drives the built-in provider for tests, demos and the CLI:");
                println!();
                println!("- available: bool (default true); false makes every request fall back");
                println!("- granted: array of record kinds with read permission (default: all)");
                println!("- fail: array of record kinds whose reads fail (default: none)");
                println!("- records: array of tagged records, chronological per kind");
                println!();
                println!("Record kinds and their payloads:");
                println!();
                println!("  steps              {{ count, timestamp }}");
                println!("  energy             {{ kilocalories, timestamp }}");
                println!("  sleep              {{ start, end }}");
                println!("  weight             {{ kilograms, timestamp }}");
                println!("  height             {{ meters, timestamp }}");
                println!("  heart_rate         {{ samples: [{{ beats_per_minute, timestamp }}] }}");
                println!("  oxygen_saturation  {{ percentage, timestamp }}");
                println!();
                println!("Timestamps are RFC 3339 instants, e.g. \"2024-03-14T08:00:00Z\".");
            }
        }
        SchemaType::Summary => {
            if json_schema {
                println!("{}", get_summary_json_schema());
            } else {
                println!("Summary Response");
                println!();
                println!("A flat object, fully populated on every path:");
                println!();
                println!("- step_count: integer (sum over the window)");
                println!("- calories: integer (sum, truncated)");
                println!("- total_sleep_minutes: integer (whole minutes per session, summed)");
                println!("- bmi: number, one decimal (latest weight / latest height squared)");
                println!("- heart_rate_bpm: integer (average, truncated)");
                println!("- spo2: integer (average, truncated)");
                println!("- stress_level: integer 1-5 (stepped off heart_rate_bpm)");
                println!();
                println!("Missing kinds use per-field defaults; a failed request returns the");
                println!("whole-summary fallback {{8500, 2100, 480, 22.5, 72, 98, 3}}.");
            }
        }
        SchemaType::Report => {
            if json_schema {
                println!("{}", get_report_json_schema());
            } else {
                println!("Insight Report");
                println!();
                println!("Advisory analysis derived from a summary:");
                println!();
                println!("- health_score: number 0-100, one decimal");
                println!("- risk_level: Low | Medium | High");
                println!("- risk_color: green | orange | red");
                println!("- recommendations: array of strings");
                println!("- detailed_risks: {{ diabetes, cardiovascular, obesity, sleep_disorders }}");
                println!("  each {{ risk_percentage: integer 0-100, level: Low | Medium | High }}");
                println!("- summary: the summary the report was derived from");
            }
        }
    }

    Ok(())
}

// Helper functions

fn get_fixture_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://vitalsum.dev/schemas/fixture.v1.json",
        "title": "vitalsum.fixture.v1",
        "description": "Fixture document for the Vitalsum built-in provider",
        "type": "object",
        "properties": {
            "available": { "type": "boolean", "default": true },
            "granted": {
                "type": "array",
                "items": { "$ref": "#/$defs/record_kind" }
            },
            "fail": {
                "type": "array",
                "items": { "$ref": "#/$defs/record_kind" }
            },
            "records": {
                "type": "array",
                "items": { "type": "object" }
            }
        },
        "$defs": {
            "record_kind": {
                "type": "string",
                "enum": ["steps", "energy", "sleep", "weight", "height", "heart_rate", "oxygen_saturation"]
            }
        }
    })
    .to_string()
}

fn get_summary_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://vitalsum.dev/schemas/summary.v1.json",
        "title": "vitalsum.summary.v1",
        "description": "Vitalsum health summary response",
        "type": "object",
        "required": ["step_count", "calories", "total_sleep_minutes", "bmi", "heart_rate_bpm", "spo2", "stress_level"],
        "properties": {
            "step_count": { "type": "integer", "minimum": 0 },
            "calories": { "type": "integer", "minimum": 0 },
            "total_sleep_minutes": { "type": "integer", "minimum": 0 },
            "bmi": { "type": "number" },
            "heart_rate_bpm": { "type": "integer", "minimum": 0 },
            "spo2": { "type": "integer", "minimum": 0, "maximum": 100 },
            "stress_level": { "type": "integer", "minimum": 1, "maximum": 5 }
        }
    })
    .to_string()
}

fn get_report_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://vitalsum.dev/schemas/report.v1.json",
        "title": "vitalsum.report.v1",
        "description": "Vitalsum insight report",
        "type": "object",
        "required": ["health_score", "risk_level", "risk_color", "recommendations", "detailed_risks", "summary"],
        "properties": {
            "health_score": { "type": "number", "minimum": 0, "maximum": 100 },
            "risk_level": { "type": "string", "enum": ["Low", "Medium", "High"] },
            "risk_color": { "type": "string", "enum": ["green", "orange", "red"] },
            "recommendations": { "type": "array", "items": { "type": "string" } },
            "detailed_risks": {
                "type": "object",
                "required": ["diabetes", "cardiovascular", "obesity", "sleep_disorders"],
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "risk_percentage": { "type": "integer", "minimum": 0, "maximum": 100 },
                        "level": { "type": "string", "enum": ["Low", "Medium", "High"] }
                    }
                }
            },
            "summary": { "$ref": "https://vitalsum.dev/schemas/summary.v1.json" }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum VitalsumCliError {
    Io(io::Error),
    Fixture(ProviderError),
    Json(serde_json::Error),
    NoInput,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for VitalsumCliError {
    fn from(e: io::Error) -> Self {
        VitalsumCliError::Io(e)
    }
}

impl From<ProviderError> for VitalsumCliError {
    fn from(e: ProviderError) -> Self {
        VitalsumCliError::Fixture(e)
    }
}

impl From<serde_json::Error> for VitalsumCliError {
    fn from(e: serde_json::Error) -> Self {
        VitalsumCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VitalsumCliError> for CliError {
    fn from(e: VitalsumCliError) -> Self {
        match e {
            VitalsumCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VitalsumCliError::Fixture(e) => CliError {
                code: "FIXTURE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'vitalsum schema fixture' for the expected shape".to_string()),
            },
            VitalsumCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VitalsumCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No fixture supplied".to_string(),
                hint: Some("Pass --fixture <file> (or - for stdin), or --demo".to_string()),
            },
            VitalsumCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            VitalsumCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<RecordErrorDetail>,
}

#[derive(serde::Serialize)]
struct RecordErrorDetail {
    index: usize,
    kind: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    engine: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
