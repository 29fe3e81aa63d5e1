//! CLI command implementations
//!
//! Each command loads the config, opens the store under `data_dir` and
//! prints one JSON response. The engines are async; commands drive them on
//! a runtime built per invocation.

use std::fs;
use std::future::Future;
use std::path::Path;

use serde_json::{json, Value};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;
use crate::config::KekConfig;
use crate::error::KekError;
use crate::document::{attributes_from_json, Attributes, DocumentEngine};
use crate::observability::Logger;
use crate::query::{DocQuery, QueryEngine, SearchQuery};
use crate::space::{Kekspace, SpaceConfig};
use crate::storage::LocalBackend;

/// Run the CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a specific command. Log lines go to stderr so stdout carries only
/// the JSON response.
pub fn run_command(command: Command) -> CliResult<()> {
    Logger::set_stderr_only(true);

    match command {
        Command::Init { config, name } => init(&config, name),
        Command::Create {
            config,
            name,
            attrs,
        } => create(&config, &name, &attrs),
        Command::Get {
            config,
            id,
            revisions,
        } => get(&config, &id, revisions),
        Command::Update {
            config,
            id,
            attrs,
            patch,
        } => update(&config, &id, &attrs, patch),
        Command::Delete { config, id } => delete(&config, &id),
        Command::Find {
            config,
            filters,
            order_by,
            offset,
            limit,
            revisions,
        } => {
            let mut query = DocQuery::new().offset(offset).limit(limit);
            for raw in &filters {
                let predicate = SearchQuery::parse_equality(raw).ok_or_else(|| {
                    CliError::invalid_argument(format!("expected FIELD=VALUE, got '{}'", raw))
                })?;
                query = query.filter(predicate);
            }
            if let Some(field) = order_by {
                query = query.order_by(field);
            }
            if revisions {
                query = query.with_revisions();
            }
            find(&config, &query)
        }
        Command::Verify { config, id } => verify(&config, &id),
        Command::Repair { config, id } => repair(&config, &id),
    }
}

/// Load and validate the config, then apply its log level.
fn load_config(config_path: &Path) -> CliResult<KekConfig> {
    let config = KekConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

fn block_on<F: Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io_error(format!("failed to start runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

fn parse_attributes(raw: &str) -> CliResult<Attributes> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::invalid_argument(format!("attributes are not JSON: {}", e)))?;
    attributes_from_json(value)
        .ok_or_else(|| CliError::invalid_argument("attributes must be a JSON object"))
}

/// Create the kekspace record under `data_dir`
pub fn init(config_path: &Path, name: Option<String>) -> CliResult<()> {
    let config = load_config(config_path)?;
    fs::create_dir_all(&config.data_dir)?;

    let backend = LocalBackend::new(config.data_dir.clone());
    let space = Kekspace::create(&backend, SpaceConfig {
        name,
        ..SpaceConfig::default()
    })
    .map_err(KekError::from)?;

    write_response(&space)
}

pub fn create(config_path: &Path, name: &str, attrs: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let attributes = parse_attributes(attrs)?;
    let engine = DocumentEngine::open(&config);

    let document = block_on(engine.create(name, attributes))??;
    write_response(&document)
}

pub fn get(config_path: &Path, id: &str, revisions: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = DocumentEngine::open(&config);

    let document = block_on(engine.get(id, revisions))??;
    write_response(&document)
}

pub fn update(config_path: &Path, id: &str, attrs: &str, patch: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let attributes = parse_attributes(attrs)?;
    let engine = DocumentEngine::open(&config);

    let document = block_on(engine.update(id, attributes, patch))??;
    write_response(&document)
}

pub fn delete(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = DocumentEngine::open(&config);

    block_on(engine.delete(id))??;
    write_response(&json!({ "deleted": id }))
}

pub fn find(config_path: &Path, query: &DocQuery) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = QueryEngine::new(DocumentEngine::open(&config), &config);

    let documents = block_on(engine.find(query))??;
    write_response(&documents)
}

pub fn verify(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = DocumentEngine::open(&config);

    let chain = block_on(engine.verify(id))??;
    write_response(&json!({
        "id": id,
        "valid": true,
        "blocks": chain.len(),
        "head": chain.head_hash(),
    }))
}

pub fn repair(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = DocumentEngine::open(&config);

    let report = block_on(engine.repair(id))??;
    write_response(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("kek.json");
        let data_dir = dir.path().join("data");
        fs::write(
            &path,
            json!({ "data_dir": data_dir, "log_level": "error" }).to_string(),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_init_then_create_and_find() {
        let dir = TempDir::new().unwrap();
        let config_path = write_config(&dir);

        run_command(Command::Init {
            config: config_path.clone(),
            name: Some("notes".into()),
        })
        .unwrap();
        run_command(Command::Create {
            config: config_path.clone(),
            name: "first".into(),
            attrs: r#"{"color":"red"}"#.into(),
        })
        .unwrap();
        run_command(Command::Find {
            config: config_path,
            filters: vec!["color=red".into()],
            order_by: None,
            offset: 0,
            limit: 10,
            revisions: false,
        })
        .unwrap();
    }

    #[test]
    fn test_commands_keep_logs_off_stdout() {
        let dir = TempDir::new().unwrap();
        let config_path = write_config(&dir);

        run_command(Command::Init {
            config: config_path,
            name: None,
        })
        .unwrap();
        assert!(Logger::stderr_only());
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let config_path = write_config(&dir);

        init(&config_path, None).unwrap();
        let err = init(&config_path, None).unwrap_err();
        assert_eq!(err.code_str(), "KEK_SPACE_ALREADY_INITIALIZED");
    }

    #[test]
    fn test_bad_where_is_invalid_argument() {
        let dir = TempDir::new().unwrap();
        let err = run_command(Command::Find {
            config: write_config(&dir),
            filters: vec!["novalue".into()],
            order_by: None,
            offset: 0,
            limit: 0,
            revisions: false,
        })
        .unwrap_err();
        assert_eq!(err.code_str(), "KEK_CLI_INVALID_ARGUMENT");
    }

    #[test]
    fn test_attributes_must_be_object() {
        assert!(parse_attributes(r#"{"a":1}"#).is_ok());
        assert!(parse_attributes("[1,2]").is_err());
        assert!(parse_attributes("not json").is_err());
    }

    #[test]
    fn test_missing_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = get(&dir.path().join("absent.json"), "dd1", false).unwrap_err();
        assert_eq!(err.code_str(), "KEK_CLI_CONFIG_ERROR");
    }
}
