//! rflux CLI - Command-line interface for Retention Flux
//!
//! Commands:
//! - analyze: Turn an event log into a retention report (batch mode)
//! - validate: Validate event rows against the input schema
//! - schema: Print input or output schema information
//! - doctor: Diagnose configuration and environment

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use retention_flux::pipeline::{parse_event_rows, RetentionPipeline, STAGE_CONFIGURATION};
use retention_flux::report::{Report, ReportEncoder};
use retention_flux::schema::{EventLogAdapter, EventRecord};
use retention_flux::{
    AnalysisConfig, ComputeError, PRODUCER_NAME, REPORT_VERSION, SCHEMA_VERSION, VERSION,
};

/// rflux - Sessions, transitions and behavioral patterns from app event logs
#[derive(Parser)]
#[command(name = "rflux")]
#[command(author = "Retention Flux Contributors")]
#[command(version = VERSION)]
#[command(about = "Turn app event logs into retention reports", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an event log and write the report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Analysis configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override discovery.min_support
        #[arg(long)]
        min_support: Option<f64>,

        /// Override discovery.min_confidence
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Include the push / app lifecycle profile
        #[arg(long)]
        system_events: bool,

        /// Stamp producer, instance id and compute time into the metadata
        #[arg(long)]
        provenance: bool,
    },

    /// Validate event rows
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an analysis configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// Detect from the first character
    Auto,
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
    /// Input schema (event_log.v1)
    Input,
    /// Output schema (retention.report.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), RfluxCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
            min_support,
            min_confidence,
            system_events,
            provenance,
        } => {
            let config =
                load_config(config.as_deref(), min_support, min_confidence, system_events)?;
            cmd_analyze(&input, &output, input_format, output_format, config, provenance)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(
    path: Option<&Path>,
    min_support: Option<f64>,
    min_confidence: Option<f64>,
    system_events: bool,
) -> Result<AnalysisConfig, RfluxCliError> {
    let mut config = match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            AnalysisConfig::from_json(&fs::read_to_string(path)?)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(value) = min_support {
        config.discovery.min_support = value;
    }
    if let Some(value) = min_confidence {
        config.discovery.min_confidence = value;
    }
    if system_events {
        config.profile.analyze_system_events = true;
    }
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, RfluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_rows(data: &str, format: &InputFormat) -> Result<Vec<EventRecord>, RfluxCliError> {
    let records = match format {
        InputFormat::Ndjson => EventLogAdapter::parse_ndjson(data)?,
        InputFormat::Json => EventLogAdapter::parse_array(data)?,
        InputFormat::Auto => parse_event_rows(data)?,
    };
    Ok(records)
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: AnalysisConfig,
    provenance: bool,
) -> Result<(), RfluxCliError> {
    let pipeline = RetentionPipeline::new(config)?;

    let input_data = read_input(input)?;
    let records = parse_rows(&input_data, &input_format)?;
    if records.is_empty() {
        return Err(RfluxCliError::NoEvents);
    }

    let events = EventLogAdapter::to_events(&records)?;
    let report = pipeline.run(events);
    if report.is_truncated() {
        info!(
            "Report contains partial results for: {}",
            report.metadata.truncated_stages.join(", ")
        );
    }

    let output_data = format_output(&report, &output_format, provenance)?;
    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn format_output(
    report: &Report,
    format: &OutputFormat,
    provenance: bool,
) -> Result<String, RfluxCliError> {
    let mut encoder = ReportEncoder::new();
    if provenance {
        encoder = encoder.with_provenance();
    }
    let encoded = match format {
        OutputFormat::Json => encoder.encode_to_json(report)?,
        OutputFormat::JsonPretty => encoder.encode_to_json_pretty(report)?,
    };
    Ok(encoded)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), RfluxCliError> {
    let input_data = read_input(input)?;
    let records = parse_rows(&input_data, &input_format)?;
    let issues = EventLogAdapter::validate_records(&records);

    let report = ValidationReport {
        total_events: records.len(),
        valid_events: records.len() - issues.len(),
        invalid_events: issues.len(),
        errors: issues
            .into_iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                user_id: issue.user_id,
                error: issue.message,
                hint: issue.hint,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {} (user {}): {}", err.index, err.user_id, err.error);
                if let Some(hint) = &err.hint {
                    println!("    hint: {}", hint);
                }
            }
        }
    }

    if report.invalid_events > 0 {
        Err(RfluxCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), RfluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One row per event, as a JSON array or NDJSON:");
                println!();
                println!("- user_id (alias user_uuid): string, required");
                println!("- event_name: string, required");
                println!("- timestamp (alias event_time): ISO-8601 with UTC offset");
                println!("- category: application | system (case-insensitive)");
                println!();
                println!("Session markers (system events that open a new session):");
                println!("  Session Started, Journey Started, App Installed, User Login, Push Click");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("- metadata: {{ counts, discovery_config, truncated_stages, provenance? }}");
                println!("- basic_stats: {{ totals, date_range, events per user }}");
                println!("- sessions: {{ session_detection_method, lengths, durations, bounce_rate, ... }}");
                println!("- transitions: {{ transition_probabilities, most_common_transitions, high_exit_events }}");
                println!("- event_classification: keyword class -> {{ event_count, unique_events, examples }}");
                println!("- sequential_patterns: {{ frequent_patterns, repetition_patterns, dropout_sequences }}");
                println!("- user_segments: {{ segments, total_users, feature_summary }}");
                println!("- survival_analysis: {{ survival_curve, critical_dropoffs, median_session_length }}");
                println!("- friction_points: {{ high_friction_events, friction_summary }}");
                println!("- intervention_rules: {{ algorithm, intervention_triggers }}");
                println!("- time_patterns, deduplication, system_events (opt-in)");
            }
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), RfluxCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "version".to_string(),
            status: CheckStatus::Ok,
            message: format!("rflux version {}", VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}, report: {}", SCHEMA_VERSION, REPORT_VERSION),
        },
    ];

    if let Some(path) = config {
        let check = if !path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Configuration file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(path)
                .map_err(RfluxCliError::from)
                .and_then(|content| {
                    AnalysisConfig::from_json(&content).map_err(RfluxCliError::from)
                })
            {
                Ok(parsed) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Configuration valid (min_support {}, min_confidence {})",
                        parsed.discovery.min_support, parsed.discovery.min_confidence
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: CliError::from(e).message,
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass --input <file>)"
    } else {
        "stdin is a pipe (--input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("rflux Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
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
        Err(RfluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": SCHEMA_VERSION,
        "type": "object",
        "required": ["event_name", "category"],
        "properties": {
            "user_id": { "type": "string", "minLength": 1 },
            "user_uuid": { "type": "string", "minLength": 1 },
            "event_name": { "type": "string", "minLength": 1 },
            "timestamp": { "type": "string", "description": "ISO-8601 with UTC offset" },
            "event_time": { "type": "string", "description": "ISO-8601 with UTC offset" },
            "category": {
                "type": "string",
                "enum": ["application", "system"],
                "description": "Matched case-insensitively"
            }
        },
        "oneOf": [
            { "required": ["user_id"] },
            { "required": ["user_uuid"] }
        ]
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": REPORT_VERSION,
        "type": "object",
        "required": [
            "metadata", "basic_stats", "sessions", "transitions", "event_classification",
            "sequential_patterns", "user_segments", "survival_analysis", "friction_points",
            "intervention_rules", "time_patterns", "deduplication"
        ],
        "properties": {
            "metadata": {
                "type": "object",
                "required": ["report_version", "schema_version", "total_events", "unique_users",
                             "total_sessions", "discovery_config", "truncated_stages"],
                "properties": {
                    "discovery_config": {
                        "type": "object",
                        "properties": {
                            "min_support": { "type": "number", "minimum": 0, "maximum": 1 },
                            "min_confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                        }
                    },
                    "truncated_stages": { "type": "array", "items": { "type": "string" } }
                }
            },
            "sessions": {
                "type": "object",
                "properties": {
                    "session_detection_method": { "const": "system_events_only" },
                    "bounce_rate": { "type": "number", "minimum": 0, "maximum": 1 },
                    "common_start_events": { "type": "object" },
                    "common_end_events": { "type": "object" }
                }
            },
            "transitions": {
                "type": "object",
                "properties": {
                    "transition_probabilities": { "type": "object" },
                    "most_common_transitions": { "type": "array" },
                    "high_exit_events": { "type": "array" }
                }
            },
            "intervention_rules": {
                "type": "object",
                "properties": {
                    "algorithm": { "enum": ["apriori", "manual"] },
                    "intervention_triggers": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["condition", "outcome", "confidence", "support"],
                            "properties": {
                                "outcome": { "const": "dropout_likely" }
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum RfluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for RfluxCliError {
    fn from(e: io::Error) -> Self {
        RfluxCliError::Io(e)
    }
}

impl From<ComputeError> for RfluxCliError {
    fn from(e: ComputeError) -> Self {
        RfluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for RfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        RfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RfluxCliError> for CliError {
    fn from(e: RfluxCliError) -> Self {
        match e {
            RfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RfluxCliError::Compute(
                e @ (ComputeError::InvalidConfig(_)
                | ComputeError::StageFailed {
                    stage: STAGE_CONFIGURATION,
                    ..
                }),
            ) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Check the configuration JSON; thresholds are fractions in [0, 1]".to_string(),
                ),
            },
            RfluxCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!(
                    "Ensure input matches {SCHEMA_VERSION}; run 'rflux validate' for details"
                )),
            },
            RfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RfluxCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RfluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            RfluxCliError::DoctorFailed => CliError {
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
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    user_id: String,
    error: String,
    hint: Option<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
