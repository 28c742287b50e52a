//! Schema Form CLI
//!
//! Command-line interface for normalizing, validating and linting form schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_form::{
    is_url, lint, load_schema, load_schema_auto, DirSource, FileStatus, FormOutline, FormSession,
    FormValues, OutlineNode, Severity, SubmitError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Normalize, validate and lint declarative form schemas")]
#[command(version)]
struct Cli {
    /// Directory that schema names are resolved against
    #[arg(long, global = true, default_value = ".")]
    schema_dir: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema document into its id-indexed tables
    Normalize {
        /// Schema source: file path, URL, or a name under --schema-dir
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate form values against a schema
    Validate {
        /// Schema source: file path, URL, or a name under --schema-dir
        schema: String,

        /// JSON object mapping field paths to values
        #[arg(long)]
        values: Option<PathBuf>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print what a renderer would show for the given values
    Outline {
        /// Schema source: file path, URL, or a name under --schema-dir
        schema: String,

        /// JSON object mapping field paths to values
        #[arg(long)]
        values: Option<PathBuf>,

        /// Output the outline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint schema files for errors (syntax, shape, dangling references)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Normalize {
            schema,
            output,
            pretty,
        } => run_normalize(&cli.schema_dir, &schema, output, pretty),

        Commands::Validate {
            schema,
            values,
            json,
        } => run_validate(&cli.schema_dir, &schema, values.as_deref(), json),

        Commands::Outline {
            schema,
            values,
            json,
        } => run_outline(&cli.schema_dir, &schema, values.as_deref(), json),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load a schema into a fresh session.
///
/// URLs and existing files are read directly; anything else is a schema
/// name looked up in `schema_dir`.
fn open_session(schema_dir: &Path, schema: &str) -> Result<FormSession, u8> {
    let mut session = FormSession::new();
    let loaded = if is_url(schema) || Path::new(schema).is_file() {
        session.begin_load(schema);
        let fetched = load_schema_auto(schema);
        session.finish_load(schema, fetched)
    } else {
        session.load(&DirSource::new(schema_dir), schema)
    };

    loaded.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(session)
}

/// Overlay a values file onto the session's seeded defaults.
fn apply_values(session: &mut FormSession, path: &Path) -> Result<(), u8> {
    let document = load_schema(path).map_err(|e| {
        eprintln!("Error loading values: {}", e);
        e.exit_code() as u8
    })?;
    let Value::Object(entries) = document else {
        eprintln!("Error: values file must contain a JSON object of path -> value");
        return Err(2);
    };

    for (path, value) in entries {
        session.set_value(&path, value);
    }
    Ok(())
}

fn run_normalize(
    schema_dir: &Path,
    schema: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let session = open_session(schema_dir, schema)?;
    let Some(processed) = session.schema() else {
        eprintln!("Error: no schema loaded");
        return Err(2);
    };

    let json_output = if pretty {
        serde_json::to_string_pretty(processed)
    } else {
        serde_json::to_string(processed)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    for diag in session.diagnostics() {
        eprintln!("warning[{}]: {} - {}", diag.code, diag.path, diag.message);
    }

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(
    schema_dir: &Path,
    schema: &str,
    values: Option<&Path>,
    json_output: bool,
) -> Result<(), u8> {
    let mut session = open_session(schema_dir, schema)?;
    if let Some(path) = values {
        apply_values(&mut session, path)?;
    }

    match session.submit() {
        Ok(values) => {
            if json_output {
                let output = serde_json::json!({ "valid": true, "values": values });
                println!("{}", output);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(SubmitError::Invalid { .. }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": session.errors()
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for (path, messages) in session.errors() {
                    for message in messages {
                        eprintln!("  {}: {}", path, message);
                    }
                }
            }
            Err(1)
        }
        Err(e @ SubmitError::NoSchema) => {
            eprintln!("Error: {}", e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_outline(
    schema_dir: &Path,
    schema: &str,
    values: Option<&Path>,
    json_output: bool,
) -> Result<(), u8> {
    let mut session = open_session(schema_dir, schema)?;
    if let Some(path) = values {
        apply_values(&mut session, path)?;
    }
    let Some(outline) = session.outline() else {
        eprintln!("Error: no schema loaded");
        return Err(2);
    };

    if json_output {
        let rendered = serde_json::to_string_pretty(&outline).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        print!("{}", render_outline(&outline, session.values()));
    }
    Ok(())
}

fn render_outline(outline: &FormOutline, values: &FormValues) -> String {
    let mut out = String::new();
    let title = if outline.name.is_empty() {
        &outline.form_id
    } else {
        &outline.name
    };
    out.push_str(&format!("{} ({})\n", title, outline.form_id));
    for node in &outline.sections {
        render_node(node, values, 1, &mut out);
    }
    out.push_str(&format!(
        "\n{} visible fields, {} not found\n",
        outline.visible_fields().len(),
        outline.missing().len()
    ));
    out
}

fn render_node(node: &OutlineNode, values: &FormValues, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        OutlineNode::Section {
            id,
            name,
            required,
            children,
        } => {
            let marker = if *required { " *" } else { "" };
            let title = if name.is_empty() { id } else { name };
            out.push_str(&format!("{indent}[section] {title}{marker}\n"));
            for child in children {
                render_node(child, values, depth + 1, out);
            }
        }
        OutlineNode::Group {
            id,
            name,
            repeatable,
            min_instances,
            max_instances,
            children,
            ..
        } => {
            let title = if name.is_empty() { id } else { name };
            let repeat = if *repeatable {
                format!(
                    " (instance 1, min {}, max {})",
                    min_instances.map_or("-".to_string(), |n| n.to_string()),
                    max_instances.map_or("-".to_string(), |n| n.to_string())
                )
            } else {
                String::new()
            };
            out.push_str(&format!("{indent}[group] {title}{repeat}\n"));
            for child in children {
                render_node(child, values, depth + 1, out);
            }
        }
        OutlineNode::Field {
            label,
            path,
            data_type,
            required,
            value,
            errors,
            id,
        } => {
            let marker = if *required { " *" } else { "" };
            let title = if label.is_empty() { id } else { label };
            let shown = match value {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            let source = if value.is_some() && !values.contains_key(path) {
                " (default)"
            } else {
                ""
            };
            out.push_str(&format!(
                "{indent}{title}{marker} <{data_type}> {path} = {shown}{source}\n"
            ));
            for error in errors {
                out.push_str(&format!("{indent}  ! {error}\n"));
            }
        }
        OutlineNode::Hidden { .. } => {}
        OutlineNode::NotFound { element, id, .. } => {
            out.push_str(&format!("{indent}{element} not found: {id}\n"));
        }
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
