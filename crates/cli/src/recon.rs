//! `tally run | validate | inspect`: config-driven reconciliation batch.

use std::io::{self, Write};
use std::path::PathBuf;

use log::{debug, info};
use tally_io::{storage, IoError};
use tally_recon::report::{self, Layout};
use tally_recon::{PolicyVersion, ReconConfig, ReconResult, ReportFormat};

use crate::exit_codes::{EXIT_RECON_FAILING, EXIT_USAGE};
use crate::util::render_table;
use crate::CliError;

/// Widest column `--print` and `inspect` will render.
const MAX_PRINT_WIDTH: usize = 60;

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub layout: Option<Layout>,
    pub format: Option<ReportFormat>,
    pub output: Option<String>,
    pub policy: Option<PolicyVersion>,
    pub entities: Vec<String>,
    pub json: bool,
    pub print: bool,
    pub strict: bool,
}

// ============================================================================
// Config resolution
// ============================================================================

/// Explicit path, else `${ROOT_PATH}/config.toml`, else `${ROOT_PATH}/config.json`.
fn read_config(arg: Option<PathBuf>) -> Result<(String, ReconConfig), CliError> {
    let candidates = match arg {
        Some(path) => vec![path.to_string_lossy().into_owned()],
        None => {
            let root = std::env::var(tally_io::template::ROOT_PATH).unwrap_or_else(|_| ".".into());
            vec![
                storage::join(&root, "config.toml"),
                storage::join(&root, "config.json"),
            ]
        }
    };

    for locator in &candidates {
        match storage::read_text(locator) {
            Ok(text) => {
                let config = ReconConfig::from_str_auto(&text, locator).map_err(CliError::recon)?;
                info!("config: {} ('{}', {} sources)", locator, config.name, config.sources.len());
                return Ok((locator.clone(), config));
            }
            Err(IoError::NotFound(_)) => continue,
            Err(e) => return Err(CliError::io(e.to_string())),
        }
    }

    Err(CliError::new(
        EXIT_USAGE,
        format!("config not found: {}", candidates.join(" or ")),
    )
    .with_hint("pass a config path or set ROOT_PATH to the directory holding config.toml"))
}

/// Expand `~`/`$VAR` in every locator, logging the `[env]` definitions in play.
fn expand(config: &mut ReconConfig) {
    for (name, value) in &config.env {
        debug!("env: {} = {}", name, value);
    }
    tally_io::expand_config(config);
    for source in &config.sources {
        debug!("[{}] locator {}", source.key, source.path);
    }
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (_, mut config) = read_config(args.config)?;

    if let Some(layout) = args.layout {
        config.output.layout = layout;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(dir) = args.output {
        config.output.dir = dir;
    }
    if let Some(version) = args.policy {
        config.policy.version = Some(version);
    }
    if !args.entities.is_empty() {
        config.entities = args.entities;
    }
    expand(&mut config);

    let input = tally_io::load_sources(&config);
    let result = tally_recon::run(&config, &input).map_err(CliError::recon)?;

    let files = report::build(
        &result,
        config.output.layout,
        &config.output.id_header,
        &config.output.groups,
    );
    let written = tally_io::write_reports(&config.output.dir, &files, config.output.format)
        .map_err(|e| CliError::write(e.to_string()))?;

    if args.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else if args.print {
        let table = &report::consolidated(&result, &config.output.id_header).tables[0];
        print_stdout(&render_table(&table.columns, &table.rows, MAX_PRINT_WIDTH))?;
    }

    print_summary(&result, written.len());

    if args.strict && result.summary.failed > 0 {
        return Err(CliError::new(
            EXIT_RECON_FAILING,
            format!(
                "{} of {} entities failed",
                result.summary.failed, result.summary.total_entities
            ),
        ));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult, files_written: usize) {
    let s = &result.summary;
    eprintln!(
        "{}: {} entities, {} passed, {} failed (policy {}, {} report file(s))",
        result.meta.config_name,
        s.total_entities,
        s.passed,
        s.failed,
        result.meta.policy.version,
        files_written,
    );
    for tally in &s.per_source {
        eprintln!(
            "  {}: {} pass, {} fail, {} na",
            tally.source, tally.pass, tally.fail, tally.na
        );
    }
}

fn print_stdout(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let (locator, config) = read_config(config)?;
    eprintln!(
        "valid: '{}' with {} source(s), base '{}', {} group(s) ({})",
        config.name,
        config.sources.len(),
        config.base_key(),
        config.output.groups.len(),
        locator,
    );
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

pub fn cmd_inspect(config: Option<PathBuf>, json_output: bool) -> Result<(), CliError> {
    let (_, mut config) = read_config(config)?;
    expand(&mut config);

    let input = tally_io::load_sources(&config);
    let coverage = tally_recon::coverage(&config, &input).map_err(CliError::recon)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&coverage)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    let columns: Vec<String> = ["Source", "Kind", "Identifier", "Rows", "Missing"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows: Vec<Vec<String>> = coverage
        .sources
        .iter()
        .map(|s| {
            let src = &s.source;
            let missing = if !src.readable {
                "unreadable".to_string()
            } else if src.id_column.is_none() {
                "no identifier".to_string()
            } else if s.missing.is_empty() {
                "0".to_string()
            } else {
                format!("{} ({})", s.missing.len(), s.missing.join(", "))
            };
            vec![
                src.key.clone(),
                src.kind.to_string(),
                src.id_column.clone().unwrap_or_else(|| "-".into()),
                src.rows.to_string(),
                missing,
            ]
        })
        .collect();

    print_stdout(&render_table(&columns, &rows, MAX_PRINT_WIDTH))?;
    eprintln!(
        "{} entities from base source '{}'",
        coverage.entities, coverage.base_source
    );
    Ok(())
}
