//! Formtree CLI
//!
//! Command-line interface for rendering role-aware form definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Render a form for a role context
//! formtree render --form licence.yaml --values answers.json --role referral.yaml
//!
//! # JSON output with a fixed timestamp
//! formtree render --form licence.yaml --values answers.json --role assessor.yaml \
//!     --format json --rendered-at 2025-12-20T00:00:00Z
//!
//! # Replay value changes against the rendered tree
//! formtree render --form licence.yaml --values answers.json --role submitter.yaml \
//!     --change tabs_1.section_1.purpose=research
//!
//! # Validate a form definition
//! formtree form validate licence.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Validation failure
//! - 3: Error

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use formtree_core::{
    FieldDefinition, FormDefinition, FormRender, FormRenderer, NodeKind, RenderConfig,
    RenderNode, RoleContext, SubmittedValues, ValidationConfig, ValueChanged,
};

/// Formtree: role-aware form rendering
#[derive(Parser)]
#[command(name = "formtree")]
#[command(version)]
#[command(
    about = "Render form definitions for submitters, assessors and referrals",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a form against submitted values and a role context
    Render {
        /// Path to the form definition (YAML or JSON)
        #[arg(short, long)]
        form: PathBuf,

        /// Path to the submitted values (YAML or JSON); empty if not provided
        #[arg(short, long)]
        values: Option<PathBuf>,

        /// Path to the role context (YAML or JSON)
        #[arg(short, long)]
        role: PathBuf,

        /// Path to the renderer configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Value change to apply after rendering, as path=value where path is the
        /// field path, e.g. `section_1.purpose` (can be specified multiple times)
        #[arg(long, value_parser = parse_change)]
        change: Vec<ValueChanged>,

        /// Explicit timestamp for deterministic output (ISO 8601 / RFC 3339).
        /// Example: --rendered-at 2025-12-20T00:00:00Z
        #[arg(long, value_parser = parse_datetime)]
        rendered_at: Option<DateTime<Utc>>,
    },

    /// Form definition commands
    Form {
        #[command(subcommand)]
        action: FormAction,
    },
}

#[derive(Subcommand)]
enum FormAction {
    /// Validate a form definition
    Validate {
        /// Path to the form definition
        path: PathBuf,

        /// Accept unknown field types instead of rejecting them
        #[arg(long)]
        permissive: bool,
    },

    /// Show the field outline of a form definition
    Show {
        /// Path to the form definition
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Parse ISO 8601 / RFC 3339 datetime string to DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            format!(
                "Invalid datetime format: {}. Expected RFC 3339 (e.g., 2025-12-20T00:00:00Z)",
                e
            )
        })
}

/// Parse `path=value`. `true`/`false` toggle checkboxes; anything else is a selection.
fn parse_change(s: &str) -> Result<ValueChanged, String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid change '{}'. Expected path=value", s))?;

    if field.is_empty() {
        return Err(format!("Invalid change '{}'. Field path is empty", s));
    }

    Ok(match value {
        "true" => ValueChanged::checked(field, true),
        "false" => ValueChanged::checked(field, false),
        _ => ValueChanged::selected(field, value),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match run() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            form,
            values,
            role,
            config,
            format,
            change,
            rendered_at,
        } => render_command(form, values, role, config, format, change, rendered_at),

        Commands::Form { action } => match action {
            FormAction::Validate { path, permissive } => validate_form(path, permissive),
            FormAction::Show { path } => show_form(path),
        },
    }
}

fn load_form(path: &Path, config: &ValidationConfig) -> Result<FormDefinition> {
    if is_json(path) {
        FormDefinition::from_json_file(path, config)
    } else {
        FormDefinition::from_yaml_file(path, config)
    }
    .with_context(|| format!("Failed to load form definition from {:?}", path))
}

fn load_values(path: &Path) -> Result<SubmittedValues> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read values from {:?}", path))?;

    let values: Value = if is_json(path) {
        serde_json::from_str(&contents)?
    } else {
        serde_yaml::from_str(&contents)?
    };

    match values {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(SubmittedValues::new()),
        _ => Err(anyhow!("Submitted values in {:?} must be a mapping", path)),
    }
}

fn load_role(path: &Path) -> Result<RoleContext> {
    if is_json(path) {
        RoleContext::from_json_file(path)
    } else {
        RoleContext::from_yaml_file(path)
    }
    .with_context(|| format!("Failed to load role context from {:?}", path))
}

fn render_command(
    form_path: PathBuf,
    values_path: Option<PathBuf>,
    role_path: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    changes: Vec<ValueChanged>,
    rendered_at: Option<DateTime<Utc>>,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => RenderConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => RenderConfig::default(),
    };

    let form = load_form(&form_path, &config.validation)?;
    let values = match values_path {
        Some(path) => load_values(&path)?,
        None => SubmittedValues::new(),
    };
    let role = load_role(&role_path)?;

    let mut renderer = FormRenderer::new(config);
    renderer
        .set_role_context(role)
        .context("Invalid role context")?;

    // Explicit timestamp wins over the configured one
    let mut output = match rendered_at {
        Some(timestamp) => renderer.render_at(&form, &values, timestamp),
        None => renderer.render(&form, &values),
    }
    .context("Render failed")?;

    let deltas: Vec<_> = changes
        .iter()
        .map(|event| output.apply_value_change(event))
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "render": &output,
                "changes": deltas,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            print_text_render(&output);
            if !deltas.is_empty() {
                println!();
                println!("Changes:");
                for delta in &deltas {
                    if delta.is_noop() {
                        println!("  {}: no change", delta.field);
                    } else {
                        println!(
                            "  {}: hide {} / reveal {}",
                            delta.field,
                            delta.hidden.as_deref().unwrap_or("-"),
                            delta.revealed.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }
    }

    Ok(ExitCode::from(0))
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::TextInput { .. } => "input",
        NodeKind::TextArea => "text_area",
        NodeKind::Select { multiple: true, .. } => "multi-select",
        NodeKind::Select { .. } => "select",
        NodeKind::RadioButtons { .. } => "radiobuttons",
        NodeKind::Checkbox => "checkbox",
        NodeKind::Declaration => "declaration",
        NodeKind::File { .. } => "file",
        NodeKind::Date => "date",
        NodeKind::Label => "label",
        NodeKind::Group => "group",
        NodeKind::Section => "section",
        NodeKind::TabPane { .. } => "tab",
        NodeKind::ConditionBranch { .. } => "branch",
        NodeKind::Annotation { .. } => "annotation",
        NodeKind::AnnotationRow => "row",
    }
}

fn print_node(node: &RenderNode, depth: usize) {
    let mut line = format!("{}[{}] {}", "  ".repeat(depth), kind_name(&node.kind), node.name());

    if let Some(label) = &node.attrs.label {
        line.push_str(&format!(" \"{}\"", label));
    }
    if !node.attrs.value.is_null() {
        line.push_str(&format!(" = {}", node.attrs.value));
    }
    // Branch nodes show the path value changes address
    if let NodeKind::ConditionBranch { field, .. } = &node.kind {
        line.push_str(&format!(" <{}>", field));
    }
    match &node.kind {
        NodeKind::ConditionBranch { revealed: false, .. } => line.push_str(" (hidden)"),
        NodeKind::TabPane { active: true, .. } => line.push_str(" (active)"),
        _ => {}
    }
    if node.attrs.readonly {
        line.push_str(" [readonly]");
    }

    println!("{}", line);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn print_text_render(output: &FormRender) {
    for node in &output.nodes {
        print_node(node, 0);
    }

    if !output.sections.is_empty() {
        println!();
        println!("Sections:");
        for section in &output.sections {
            println!(
                "  - {}: {}",
                section.name,
                section.label.as_deref().unwrap_or("")
            );
        }
    }

    if !output.tabs.is_empty() {
        println!();
        println!("Tabs:");
        for tab in &output.tabs {
            println!(
                "  - {} (#{}): {}",
                tab.name,
                tab.id,
                tab.label.as_deref().unwrap_or("")
            );
        }
    }

    println!();
    println!("Rendered at: {}", output.rendered_at.to_rfc3339());
}

fn validate_form(path: PathBuf, permissive: bool) -> Result<ExitCode> {
    let config = ValidationConfig {
        strict_field_types: !permissive,
    };

    let form = if is_json(&path) {
        FormDefinition::from_json_file(&path, &config)
    } else {
        FormDefinition::from_yaml_file(&path, &config)
    };

    match form {
        Ok(form) => {
            println!(
                "Form is valid: {}",
                form.name.as_deref().unwrap_or("(unnamed)")
            );
            println!();
            println!("Top-level fields: {}", form.fields.len());
            println!("Total fields: {}", form.field_count());

            let warnings = form.validate(&config)?;
            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
            Ok(ExitCode::from(0))
        }
        Err(e) => {
            eprintln!("Form validation failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn print_field(field: &FieldDefinition, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut flags = Vec::new();
    if field.is_visible_for_assessor_only {
        flags.push("assessor-only");
    }
    if field.can_be_edited_by_assessor {
        flags.push("annotated");
    }
    if field.is_repeatable {
        flags.push("repeatable");
    }

    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };

    println!(
        "{}- {} ({}){}",
        indent,
        field.name,
        field.kind.type_name(),
        flags
    );

    if let Some(conditions) = field.kind.conditions() {
        for branch in conditions.iter() {
            println!("{}    when {}:", indent, branch.value);
            for child in &branch.children {
                print_field(child, depth + 3);
            }
        }
    }
    for child in field.kind.children() {
        print_field(child, depth + 1);
    }
}

fn show_form(path: PathBuf) -> Result<ExitCode> {
    let form = load_form(&path, &ValidationConfig::default())?;

    println!("Form: {}", form.name.as_deref().unwrap_or("(unnamed)"));
    println!("Fields: {}", form.field_count());
    println!();

    for field in &form.fields {
        print_field(field, 0);
    }

    Ok(ExitCode::from(0))
}
