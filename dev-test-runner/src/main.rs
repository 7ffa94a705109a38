//! Wire fixture runner.
//!
//! Every `fixtures/*.json` file names a catalog, a root, a JSON value and the
//! hex bytes that value must encode to. Each fixture is encoded, compared,
//! decoded and re-encoded.
//!
//! Usage: `cargo run -p dev-test-runner -- [NAME_REGEX]`
use std::path::{Path, PathBuf};

use proto_osi::{path_de, value, Catalog, EncodeOptions, SchemaGenerator};
use regex::Regex;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct Fixture {
    #[serde(default)]
    name: Option<String>,
    catalog: Catalog,
    root: String,
    value: serde_json::Value,
    #[serde(default)]
    emit_defaults: bool,
    hex: String,
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures")
}

fn load(path: &Path) -> Result<Fixture, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("read failed: {e}"))?;
    path_de::from_slice_with_path(&bytes).map_err(|e| e.to_string())
}

fn run(fixture: &Fixture) -> Result<(), String> {
    let mut generator = SchemaGenerator::new();
    let root = generator.generate_named(&fixture.catalog, &fixture.root).map_err(|e| format!("generate: {e}"))?;
    let schema = generator.finish();

    let value = value::from_json(&schema, root, &fixture.value).map_err(|e| format!("value: {e}"))?;
    let options = EncodeOptions { emit_defaults: fixture.emit_defaults };
    let bytes = schema.encode_with(root, &value, options).map_err(|e| format!("encode: {e}"))?;
    let expected = fixture.hex.split_whitespace().collect::<String>().to_lowercase();
    let got = hex::encode(&bytes);
    if got != expected {
        return Err(format!("encoded {got}, expected {expected}"));
    }

    let decoded = schema.decode(root, &bytes).map_err(|e| format!("decode: {e}"))?;
    let again = schema.encode_with(root, &decoded, options).map_err(|e| format!("re-encode: {e}"))?;
    if again != bytes {
        return Err(format!("re-encoded {}, expected {got}", hex::encode(&again)));
    }
    Ok(())
}

fn main() {
    let filter = match std::env::args().nth(1).map(|p| Regex::new(&p)) {
        None => None,
        Some(Ok(re)) => Some(re),
        Some(Err(error)) => {
            eprintln!("invalid name filter: {error}");
            std::process::exit(2);
        }
    };

    let dir = fixtures_dir();
    let mut paths = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>(),
        Err(error) => {
            eprintln!("cannot read {}: {error}", dir.display());
            std::process::exit(2);
        }
    };
    paths.sort();

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in paths {
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let result = load(&path).and_then(|fixture| {
            let name = fixture.name.clone().unwrap_or_else(|| stem.clone());
            match &filter {
                Some(re) if !re.is_match(&name) => Ok(None),
                _ => run(&fixture).map(|()| Some(name)).map_err(|e| format!("{name}: {e}")),
            }
        });
        match result {
            Ok(None) => {}
            Ok(Some(name)) => {
                passed += 1;
                eprintln!("✅ {name}");
            }
            Err(error) => {
                failed += 1;
                eprintln!("❌ {stem}: {error}");
            }
        }
    }

    eprintln!("—— {passed} passed, {failed} failed ——");
    if failed > 0 {
        std::process::exit(1);
    }
}
