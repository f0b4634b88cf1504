//! CLI command implementations
//!
//! Each command opens the corpus from its manifest, does one thing, and
//! returns a JSON value that `run_command` writes to stdout. Logging goes
//! to stderr, so stdout carries nothing but that one response.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::corpus::{Corpus, CorpusContext, CorpusError, CorpusManifest};
use crate::index::{ChunkReader, IndexBuildReport, IndexFactory};
use crate::observability::MetricsRegistry;
use crate::segment::SegmentId;

use super::args::{Command, CorpusArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command and write its outcome as a JSON response to stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    run_command_to(cmd, &mut io::stdout().lock())
}

/// Run a command and write its outcome as a JSON response to `out`
pub fn run_command_to<W: Write>(cmd: Command, out: &mut W) -> CliResult<()> {
    let result = match cmd {
        Command::Build { corpus } => build(&corpus),
        Command::Resolve {
            corpus,
            index,
            chunk,
            key,
        } => resolve(&corpus, &index, chunk, key.as_deref()),
        Command::Read {
            corpus,
            index,
            chunk,
        } => read(&corpus, &index, chunk),
        Command::Strategies => strategies(),
    };

    match result {
        Ok(data) => write_response(out, data),
        Err(e) => {
            write_error(out, e.code_str(), e.message())?;
            Err(e)
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_logging();
    Ok(config)
}

fn open_corpus(args: &CorpusArgs) -> CliResult<Corpus> {
    let config = load_config(args.config.as_deref())?;
    let manifest = CorpusManifest::load(&args.manifest)?;

    let base = match &args.base {
        Some(dir) => dir.clone(),
        None => match args.manifest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };

    let context = CorpusContext::with_base_dir(config, base)?;
    Ok(Corpus::open(context, manifest))
}

fn report_json(report: &IndexBuildReport) -> Value {
    let indices: Vec<Value> = report
        .indices
        .iter()
        .map(|index| {
            json!({
                "id": index.manifest_id(),
                "strategy": index.strategy(),
                "chunks": index.chunk_count(),
            })
        })
        .collect();

    let failures: Vec<Value> = report
        .failures
        .iter()
        .map(|failure| {
            json!({
                "position": failure.position,
                "manifest": failure.manifest_id,
                "code": failure.error.code().code(),
                "message": failure.error.message(),
            })
        })
        .collect();

    json!({ "indices": indices, "failures": failures })
}

/// Build every index of the corpus manifest.
///
/// Failed manifests are listed in the output; the command itself still
/// succeeds.
pub fn build(args: &CorpusArgs) -> CliResult<Value> {
    let corpus = open_corpus(args)?;
    let (segment, report) = corpus.open_all("cli-build")?;

    let mut data = report_json(&report);
    data["corpus"] = json!(corpus.name()?);
    data["segment"] = json!(segment.to_string());
    data["complete"] = json!(report.is_complete());
    Ok(data)
}

/// Build only `index_id` and hand back the segment serving it.
fn open_single(corpus: &Corpus, index_id: &str) -> CliResult<SegmentId> {
    let manifest = corpus.manifest()?;
    let Some(index) = manifest.index(index_id) else {
        return Err(CliError::usage(format!(
            "Manifest '{}' has no index '{}'",
            manifest.name(),
            index_id
        )));
    };

    let (segment, report) = corpus.open_segment("cli", std::slice::from_ref(index))?;
    let (_, failures) = report.into_parts();
    match failures.into_iter().next() {
        Some(failure) => Err(CorpusError::from(failure.error).into()),
        None => Ok(segment),
    }
}

/// Locate a chunk by position or, for keyed indices, by key.
pub fn resolve(
    args: &CorpusArgs,
    index_id: &str,
    chunk: Option<i64>,
    key: Option<&str>,
) -> CliResult<Value> {
    let corpus = open_corpus(args)?;
    let segment = open_single(&corpus, index_id)?;

    let chunk = match (chunk, key) {
        (Some(chunk), _) => chunk,
        (None, Some(key)) => match corpus.find_key(segment, index_id, key)? {
            Some(found) => found as i64,
            None => return Ok(json!({ "index": index_id, "key": key, "path": null })),
        },
        (None, None) => return Err(CliError::usage("Either --chunk or --key is required")),
    };

    let path = corpus.resolve(segment, index_id, chunk)?;
    Ok(json!({
        "index": index_id,
        "chunk": chunk,
        "path": serde_json::to_value(&path)?,
    }))
}

/// Read one chunk; non-UTF-8 bytes are replaced.
pub fn read(args: &CorpusArgs, index_id: &str, chunk: i64) -> CliResult<Value> {
    let corpus = open_corpus(args)?;
    let segment = open_single(&corpus, index_id)?;

    let mut reader = ChunkReader::new();
    let bytes = corpus.read_chunk(segment, index_id, chunk, &mut reader)?;
    Ok(json!({
        "index": index_id,
        "chunk": chunk,
        "length": bytes.len(),
        "text": String::from_utf8_lossy(bytes),
    }))
}

/// List the strategies a default factory can build.
pub fn strategies() -> CliResult<Value> {
    let metrics = Arc::new(MetricsRegistry::new());
    let factory =
        IndexFactory::new(&EngineConfig::default().index, metrics).map_err(CorpusError::from)?;
    let names = factory.strategies();
    Ok(json!({ "strategies": names }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::strategy;
    use crate::observability::{Logger, Severity};
    use std::fs;
    use tempfile::TempDir;

    fn corpus_dir() -> (TempDir, CorpusArgs) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tokens.txt"), "alpha\nbeta\n").unwrap();
        fs::write(
            dir.path().join("corpus.json"),
            r#"{
                "name": "demo",
                "indices": [
                    {"id": "tokens", "strategy": "line", "source": {"files": ["tokens.txt"]}},
                    {"id": "broken", "strategy": "line", "source": {"files": ["absent.txt"]}}
                ]
            }"#,
        )
        .unwrap();
        let args = CorpusArgs {
            manifest: dir.path().join("corpus.json"),
            config: None,
            base: None,
        };
        (dir, args)
    }

    #[test]
    fn test_build_reports_failures() {
        let (_dir, args) = corpus_dir();
        let data = build(&args).unwrap();

        assert_eq!(data["corpus"], "demo");
        assert_eq!(data["complete"], false);
        assert_eq!(data["indices"][0]["chunks"], 2);
        assert_eq!(data["failures"][0]["manifest"], "broken");
        assert_eq!(data["failures"][0]["position"], 1);
    }

    #[test]
    fn test_resolve_and_read() {
        let (_dir, args) = corpus_dir();
        let data = resolve(&args, "tokens", Some(1), None).unwrap();
        assert_eq!(data["path"]["offset"], 6);
        assert_eq!(data["path"]["length"], 4);

        let data = read(&args, "tokens", 0).unwrap();
        assert_eq!(data["text"], "alpha");
    }

    #[test]
    fn test_resolve_errors() {
        let (_dir, args) = corpus_dir();

        let err = resolve(&args, "tokens", Some(-1), None).unwrap_err();
        assert_eq!(err.code_str(), "CORPUS_INDEX_OUT_OF_BOUNDS");

        let err = resolve(&args, "lemma", Some(0), None).unwrap_err();
        assert_eq!(err.code_str(), "CORPUS_CLI_USAGE_ERROR");

        assert!(resolve(&args, "broken", Some(0), None).is_err());
    }

    #[test]
    fn test_output_is_one_json_object() {
        let (_dir, args) = corpus_dir();
        Logger::configure(true, Severity::Trace);

        let mut out = Vec::new();
        run_command_to(Command::Build { corpus: args.clone() }, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["status"], "ok");

        let mut out = Vec::new();
        let cmd = Command::Read {
            corpus: args,
            index: "tokens".to_string(),
            chunk: 9,
        };
        assert!(run_command_to(cmd, &mut out).is_err());
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["code"], "CORPUS_INDEX_OUT_OF_BOUNDS");
    }

    #[test]
    fn test_strategies_lists_builtins() {
        let data = strategies().unwrap();
        let names = data["strategies"].as_array().unwrap();
        assert_eq!(names.len(), 5);
        assert!(names.iter().any(|n| n == strategy::LINE));
    }
}
