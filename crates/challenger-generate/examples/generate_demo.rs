use std::env;
use std::path::PathBuf;

use challenger_core::{CatalogStore, Configuration};
use challenger_generate::{ChallengeGenerator, ConfigSource, GenerationReport};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut catalog_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut template: Option<String> = None;
    let mut players = 2_usize;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--catalog" => catalog_path = args.next().map(PathBuf::from),
            "--config" => config_path = args.next().map(PathBuf::from),
            "--template" => template = args.next(),
            "--players" => players = args.next().ok_or("missing --players value")?.parse()?,
            "--seed" => seed = Some(args.next().ok_or("missing --seed value")?.parse()?),
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let catalog_path = catalog_path.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
    });
    let catalog = CatalogStore::load(&catalog_path)?;

    let source = match (template, config_path) {
        (Some(id), _) => ConfigSource::Template(id),
        (None, Some(path)) => {
            let config = Configuration::from_json_str(&std::fs::read_to_string(path)?)?;
            ConfigSource::Custom(serde_json::to_value(&config)?)
        }
        (None, None) => ConfigSource::Template("1".to_string()),
    };

    let mut generator = ChallengeGenerator::new(&catalog, &catalog, source);
    if let Some(seed) = seed {
        generator = generator.with_seed(seed);
    }

    let started = std::time::Instant::now();
    let outcome = generator.generate(players);
    let report =
        GenerationReport::from_outcome(&outcome, players, started.elapsed().as_millis() as u64);

    println!("{}", serde_json::to_string_pretty(&outcome.players)?);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
