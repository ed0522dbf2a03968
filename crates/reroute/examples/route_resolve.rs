use std::env;
use std::io;
use std::io::BufRead;
use std::path::PathBuf;

use reroute::data::context::{ExpansionConfig, ReferenceContext};
use reroute::data::reference::ReferenceTables;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let data_path = match args.get(1).cloned().or_else(|| env::var("REROUTE_DATA").ok()) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: {} <path_to_reference_tables> (or set REROUTE_DATA)", args[0]);
            std::process::exit(1);
        }
    };
    if !data_path.exists() {
        eprintln!("Error: Path does not exist: {}", data_path.display());
        std::process::exit(1);
    }

    let config = match env::var("REROUTE_CONFIG") {
        Ok(path) => ExpansionConfig::from_json_file(&PathBuf::from(path))?,
        Err(_) => ExpansionConfig::default(),
    };

    eprintln!("Loading reference tables from: {}", data_path.display());
    let tables = ReferenceTables::from_directory(&data_path)?;
    let context = ReferenceContext::build(tables, config);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => {
                let trimmed = l.trim();
                let trimmed = trimmed
                    .strip_prefix('"')
                    .or_else(|| trimmed.strip_prefix('\''))
                    .unwrap_or(trimmed);
                let trimmed = trimmed
                    .strip_suffix('"')
                    .or_else(|| trimmed.strip_suffix('\''))
                    .unwrap_or(trimmed);
                trimmed.to_string()
            }
            Err(_) => continue,
        };
        if line.is_empty() {
            continue;
        }

        let expansion = context.expand(&line);

        match serde_json::to_string(&expansion) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        }
    }

    Ok(())
}
