use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use flatdoc_index::{FileIndex, SecondaryIndex};
use flatdoc_store::{BlobStore, DocumentStore, FileDocumentStore, JsonSerializer, Removal};
use serde_json::Value;
use tracing::debug;

use crate::cli::*;
use crate::config::FlatdocConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = FlatdocConfig::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    debug!(root = %config.root.display(), "loaded config");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&config, cli.format, cli.command, &mut out)
}

pub(crate) fn execute(
    config: &FlatdocConfig,
    format: OutputFormat,
    command: Command,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Command::Doc(action) => cmd_doc(config, format, action, out),
        Command::Blob(action) => cmd_blob(config, format, action, out),
        Command::Index(args) => cmd_index(config, format, args, out),
    }
}

fn serializer(config: &FlatdocConfig) -> Arc<JsonSerializer> {
    Arc::new(JsonSerializer { pretty: config.pretty })
}

fn parse_json(text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("invalid JSON document: {text}"))
}

fn cmd_doc(
    config: &FlatdocConfig,
    format: OutputFormat,
    action: DocAction,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let store = FileDocumentStore::<Value>::open(&config.documents(), serializer(config))?;
    match action {
        DocAction::Get { key } => match store.get(&key)? {
            Some(doc) => print_document(out, format, &doc)?,
            None => anyhow::bail!("document {key:?} not found"),
        },
        DocAction::Exists { key } => print_bool(out, format, store.exists(&key)?)?,
        DocAction::Set { key, json } => {
            store.set(&key, &parse_json(&json)?)?;
            print_done(out, format, "Stored", &key)?;
        }
        DocAction::Add { key, json } => {
            store.add(&key, &parse_json(&json)?)?;
            print_done(out, format, "Added", &key)?;
        }
        DocAction::Replace { key, json } => {
            store.replace(&key, &parse_json(&json)?)?;
            print_done(out, format, "Replaced", &key)?;
        }
        DocAction::Delete { key } => print_removal(out, format, &key, store.delete(&key)?)?,
        DocAction::Find => {
            let docs = store.find()?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, Value> = docs.into_iter().collect();
                    writeln!(out, "{}", Value::Object(map))?;
                }
                OutputFormat::Text => {
                    if docs.is_empty() {
                        writeln!(out, "No documents.")?;
                    }
                    for (key, doc) in docs {
                        writeln!(out, "{} {}", key.yellow().bold(), doc)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_blob(
    config: &FlatdocConfig,
    format: OutputFormat,
    action: BlobAction,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let store = BlobStore::<Value>::open(&config.blobs(), serializer(config))?;
    match action {
        BlobAction::Get { key } => match store.record(&key)? {
            Some(record) => match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&record)?)?,
                OutputFormat::Text => {
                    writeln!(out, "{}", record.id.yellow().bold())?;
                    writeln!(out, "  Created: {}", record.created.to_rfc3339().cyan())?;
                    writeln!(out, "  Updated: {}", record.updated.to_rfc3339().cyan())?;
                    writeln!(out, "  {}", record.document)?;
                }
            },
            None => anyhow::bail!("blob {key:?} not found"),
        },
        BlobAction::Set { key, json } => {
            store.set(&key, &parse_json(&json)?)?;
            print_done(out, format, "Stored blob", &key)?;
        }
        BlobAction::Delete { key } => print_removal(out, format, &key, store.delete(&key)?)?,
        BlobAction::List => {
            let records = store.records()?;
            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&records)?)?,
                OutputFormat::Text => {
                    if records.is_empty() {
                        writeln!(out, "No blobs.")?;
                    }
                    for record in records {
                        writeln!(
                            out,
                            "{}  {}  {}",
                            record.id.yellow().bold(),
                            record.updated.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                            record.document,
                        )?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_index(
    config: &FlatdocConfig,
    format: OutputFormat,
    args: IndexArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let index_config = config.index(&args.name)?;
    let index = FileIndex::open(&index_config)?;
    match args.action {
        IndexAction::Get { key, value } => {
            let found = index.get(&key, &value)?;
            print_list(out, format, found.iter().map(String::as_str))?;
        }
        IndexAction::Exists { key, value } => print_bool(out, format, index.exists(&key, &value)?)?,
        IndexAction::Add { key, values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            index.add(&key, &values)?;
            print_done(out, format, "Indexed", &key)?;
        }
        IndexAction::Set { key, values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            index.set(&key, &values)?;
            print_done(out, format, "Indexed", &key)?;
        }
        IndexAction::Delete { key, value } => {
            print_removal(out, format, &key, index.delete(&key, &value)?)?
        }
        IndexAction::Values => {
            let values = index.values()?;
            print_list(out, format, values.iter().map(String::as_str))?;
        }
    }
    Ok(())
}

// ---- output ----

fn print_document(out: &mut dyn Write, format: OutputFormat, doc: &Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{doc}")?,
        OutputFormat::Text => writeln!(out, "{}", serde_json::to_string_pretty(doc)?)?,
    }
    Ok(())
}

fn print_bool(out: &mut dyn Write, format: OutputFormat, found: bool) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{found}")?,
        OutputFormat::Text if found => writeln!(out, "{}", "yes".green())?,
        OutputFormat::Text => writeln!(out, "{}", "no".red())?,
    }
    Ok(())
}

fn print_done(
    out: &mut dyn Write,
    format: OutputFormat,
    verb: &str,
    key: &str,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::json!({ "ok": true, "key": key }))?,
        OutputFormat::Text => writeln!(out, "{} {} {}", "✓".green().bold(), verb, key.yellow())?,
    }
    Ok(())
}

fn print_removal(
    out: &mut dyn Write,
    format: OutputFormat,
    key: &str,
    removal: Removal,
) -> anyhow::Result<()> {
    match (format, removal) {
        (OutputFormat::Json, removal) => writeln!(
            out,
            "{}",
            serde_json::json!({ "removed": removal.is_removed(), "key": key })
        )?,
        (OutputFormat::Text, Removal::Removed) => {
            writeln!(out, "{} Deleted {}", "✓".green().bold(), key.yellow())?
        }
        (OutputFormat::Text, Removal::Absent) => {
            writeln!(out, "Nothing to delete for {}", key.yellow())?
        }
    }
    Ok(())
}

fn print_list<'a>(
    out: &mut dyn Write,
    format: OutputFormat,
    items: impl Iterator<Item = &'a str>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<&str> = items.collect();
            writeln!(out, "{}", serde_json::to_string(&items)?)?;
        }
        OutputFormat::Text => {
            for item in items {
                writeln!(out, "{item}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config_in(dir: &std::path::Path) -> FlatdocConfig {
        let mut config: FlatdocConfig =
            toml::from_str("[[indexes]]\nname = \"email\"\nunique = true\n").unwrap();
        config.root = dir.to_path_buf();
        config
    }

    /// Run a command line against `config` with JSON output and return stdout.
    fn run(config: &FlatdocConfig, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("flatdoc").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        execute(config, OutputFormat::Json, cli.command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn json(text: &str) -> Value {
        serde_json::from_str(text.trim()).unwrap()
    }

    // ---- documents ----

    #[test]
    fn document_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(&config, &["doc", "add", "u1", r#"{"name":"Ada"}"#]).unwrap();
        assert_eq!(json(&run(&config, &["doc", "get", "u1"]).unwrap())["name"], "Ada");
        assert_eq!(run(&config, &["doc", "exists", "u1"]).unwrap().trim(), "true");

        assert!(run(&config, &["doc", "add", "u1", "{}"]).is_err());
        assert!(run(&config, &["doc", "replace", "u2", "{}"]).is_err());

        run(&config, &["doc", "replace", "u1", r#"{"name":"Grace"}"#]).unwrap();
        let all = json(&run(&config, &["doc", "find"]).unwrap());
        assert_eq!(all["u1"]["name"], "Grace");

        let removed = json(&run(&config, &["doc", "delete", "u1"]).unwrap());
        assert_eq!(removed["removed"], true);
        let again = json(&run(&config, &["doc", "delete", "u1"]).unwrap());
        assert_eq!(again["removed"], false);
        assert!(run(&config, &["doc", "get", "u1"]).is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(run(&config, &["doc", "set", "k", "{not json"]).is_err());
        assert_eq!(run(&config, &["doc", "exists", "k"]).unwrap().trim(), "false");
    }

    // ---- blobs ----

    #[test]
    fn blob_records_carry_ids() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(&config, &["blob", "set", "b1", r#"{"size":3}"#]).unwrap();
        let record = json(&run(&config, &["blob", "get", "b1"]).unwrap());
        assert_eq!(record["id"], "b1");
        assert_eq!(record["document"]["size"], 3);

        let list = json(&run(&config, &["blob", "list"]).unwrap());
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert!(dir.path().join("blobs").join("_blobs").is_dir());
    }

    // ---- indexes ----

    #[test]
    fn declared_unique_index_rejects_second_owner() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(&config, &["index", "email", "add", "u1", "ada@example.com"]).unwrap();
        assert!(run(&config, &["index", "email", "add", "u2", "ada@example.com"]).is_err());

        let owners = json(&run(&config, &["index", "email", "get", "*", "--value", "ada@example.com"]).unwrap());
        assert_eq!(owners, serde_json::json!(["u1"]));
    }

    #[test]
    fn undeclared_index_is_non_unique() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(&config, &["index", "tags", "set", "d1", "red", "blue"]).unwrap();
        run(&config, &["index", "tags", "set", "d2", "red"]).unwrap();

        let holders = json(&run(&config, &["index", "tags", "get", "*", "--value", "red"]).unwrap());
        assert_eq!(holders, serde_json::json!(["d1", "d2"]));
        let values = json(&run(&config, &["index", "tags", "get", "d1"]).unwrap());
        assert_eq!(values, serde_json::json!(["blue", "red"]));

        run(&config, &["index", "tags", "set", "d1"]).unwrap();
        let values = json(&run(&config, &["index", "tags", "values"]).unwrap());
        assert_eq!(values, serde_json::json!(["red"]));
        assert!(dir.path().join("indexes").join("tags").is_dir());
    }

    #[test]
    fn index_delete_reports_removal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(&config, &["index", "tags", "add", "d1", "red"]).unwrap();
        let removed = json(&run(&config, &["index", "tags", "delete", "d1"]).unwrap());
        assert_eq!(removed["removed"], true);
        let absent = json(&run(&config, &["index", "tags", "delete", "d1"]).unwrap());
        assert_eq!(absent["removed"], false);
    }

    #[test]
    fn bad_index_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(run(&config, &["index", "..", "values"]).is_err());
    }

    #[test]
    fn text_output_lists_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        run(&config, &["doc", "set", "k1", "1"]).unwrap();

        let mut out = Vec::new();
        execute(&config, OutputFormat::Text, Command::Doc(DocAction::Find), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("k1"));
    }
}
