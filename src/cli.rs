//! CLI: declaration files → (schema | encode | decode)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use proto_osi::path_de::catalog_from_str;
use proto_osi::{value, Catalog, EncodeOptions, SchemaGenerator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive proto3 schemas from type declarations and encode/decode values against them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// debug-level logging (overrides RUST_LOG)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate and print the schema as JSON
    Schema(SchemaOut),
    /// encode a JSON value into protobuf bytes
    Encode(EncodeIn),
    /// decode protobuf bytes into a JSON value
    Decode(DecodeIn),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more declaration files (`{"types": [...]}`). May be literal
    /// paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// declarations to generate from (every declaration if omitted)
    #[arg(long)]
    root: Vec<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct EncodeIn {
    #[command(flatten)]
    input_settings: InputSettings,

    /// root message name
    #[arg(long)]
    root: String,

    /// JSON file holding the value to encode
    #[arg(long)]
    value: PathBuf,

    /// also write singular fields that hold their default
    #[arg(long, default_value_t = false)]
    emit_defaults: bool,

    /// output binary file (hex on stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeIn {
    #[command(flatten)]
    input_settings: InputSettings,

    /// root message name
    #[arg(long)]
    root: String,

    /// encoded bytes as hex
    #[arg(long, conflicts_with = "bytes", required_unless_present = "bytes")]
    hex: Option<String>,

    /// binary file holding the encoded bytes
    #[arg(long)]
    bytes: Option<PathBuf>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_catalog(&self) -> Result<Catalog> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut catalog = Catalog::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read declaration file ({source_path_str})"))?;
            let file = catalog_from_str(&source)
                .with_context(|| format!("failed to parse declaration file ({source_path_str})"))?;
            log::debug!("{source_path_str}: {} declaration(s)", file.len());
            catalog.merge(file).with_context(|| format!("conflicting declaration in {source_path_str}"))?;
        }
        Ok(catalog)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or("warn");
        let mut builder = env_logger::Builder::from_env(env);
        if self.verbose {
            builder.filter_level(log::LevelFilter::Debug);
        }
        builder.init();
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let catalog = target.input_settings.load_catalog()?;
                let roots = if target.root.is_empty() {
                    catalog.names().map(str::to_string).collect()
                } else {
                    target.root.clone()
                };
                let mut generator = SchemaGenerator::new();
                for root in &roots {
                    generator
                        .generate_named(&catalog, root)
                        .with_context(|| format!("failed to generate schema for `{root}`"))?;
                }
                let schema = generator.finish();
                let schema_src = serde_json::to_string_pretty(&schema.to_json())?;
                write_text(target.out.as_deref(), &schema_src)
            }
            Command::Encode(target) => {
                let catalog = target.input_settings.load_catalog()?;
                let mut generator = SchemaGenerator::new();
                let root = generator
                    .generate_named(&catalog, &target.root)
                    .with_context(|| format!("failed to generate schema for `{}`", target.root))?;
                let schema = generator.finish();

                let value_path = target.value.to_string_lossy().to_string();
                let source = std::fs::read_to_string(&target.value)
                    .with_context(|| format!("failed to read value file ({value_path})"))?;
                let json = serde_json::from_str::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON value file ({value_path})"))?;
                let value = value::from_json(&schema, root, &json)
                    .with_context(|| format!("value in {value_path} does not match `{}`", target.root))?;

                let options = EncodeOptions { emit_defaults: target.emit_defaults };
                let bytes = schema.encode_with(root, &value, options).context("failed to encode value")?;
                match target.out.as_ref() {
                    Some(out) => write_bytes(out, &bytes),
                    None => {
                        println!("{}", hex::encode(&bytes));
                        Ok(())
                    }
                }
            }
            Command::Decode(target) => {
                let catalog = target.input_settings.load_catalog()?;
                let mut generator = SchemaGenerator::new();
                let root = generator
                    .generate_named(&catalog, &target.root)
                    .with_context(|| format!("failed to generate schema for `{}`", target.root))?;
                let schema = generator.finish();

                let bytes = match (&target.hex, &target.bytes) {
                    (Some(text), _) => {
                        let text = text.split_whitespace().collect::<String>();
                        hex::decode(&text).context("--hex is not valid hex")?
                    }
                    (None, Some(path)) => std::fs::read(path)
                        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?,
                    (None, None) => bail!("one of --hex or --bytes is required"),
                };
                let value = schema.decode(root, &bytes).context("failed to decode bytes")?;
                let json_src = serde_json::to_string_pretty(&value::to_json(&value))?;
                write_text(target.out.as_deref(), &json_src)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_text(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => write_bytes(out, src.as_bytes()),
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn write_bytes(out: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.to_string_lossy()))?;
    }
    std::fs::write(out, bytes).with_context(|| format!("failed to write {}", out.to_string_lossy()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn unmatched_globs_are_errors() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn decode_requires_some_input() {
        assert!(CommandLineInterface::try_parse_from(["proto-osi", "decode", "-i", "a.json", "--root", "R"]).is_err());
        assert!(
            CommandLineInterface::try_parse_from(["proto-osi", "decode", "-i", "a.json", "--root", "R", "--hex", "08"])
                .is_ok()
        );
    }
}
