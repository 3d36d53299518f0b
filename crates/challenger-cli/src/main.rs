mod registry;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use challenger_core::{
    CatalogStore, Configuration, Error as CoreError, SeedFixture, TemplateLookup,
    group_categories, validate_configuration,
};
use challenger_generate::{ChallengeGenerator, ConfigSource, GenerationReport};
use clap::{Args, Parser, Subcommand};
use registry::init_logging;
use serde_json::{Value as JsonValue, json};
use settings::{Settings, load_settings};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Parser, Debug)]
#[command(name = "challenger", version, about = "Rule-based challenge generator")]
struct Cli {
    /// Settings file (defaults to ./challenger.toml when present).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Catalog JSON file; overrides `store_path` from settings.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Log filter, e.g. `info` or `challenger_generate=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Append JSON logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import categories and values from a fixture file.
    Seed(SeedArgs),
    /// List categories by display group.
    Categories(CategoriesArgs),
    /// Check a configuration against the catalog without generating.
    Validate(ConfigArgs),
    /// Generate results for one or more players.
    Generate(GenerateArgs),
    /// Draw a single category again.
    Reroll(RerollArgs),
    /// Store a configuration as a named template.
    SaveTemplate(SaveTemplateArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Fixture JSON with an `automation` mapping.
    #[arg(long)]
    fixture: PathBuf,
    /// Do not install the "Full Random" template.
    #[arg(long, default_value_t = false)]
    no_default_templates: bool,
}

#[derive(Args, Debug)]
struct CategoriesArgs {
    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Template id from the catalog.
    #[arg(long, conflicts_with = "config")]
    template: Option<String>,
    /// Custom configuration JSON file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    source: ConfigArgs,
    /// Number of players (clamped to 1..=max_players).
    #[arg(long)]
    players: Option<usize>,
    /// Seed for reproducible draws.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RerollArgs {
    /// Category name.
    #[arg(long)]
    category: String,
    /// Rule entry as JSON.
    #[arg(long, default_value = r#"{"rule": "random_from_category"}"#)]
    rule: String,
    /// Override the rule's count.
    #[arg(long)]
    num_values: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct SaveTemplateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    /// Configuration JSON file.
    #[arg(long)]
    config: PathBuf,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    let level = cli.log_level.as_deref().or(settings.log_level.as_deref());
    init_logging(cli.log_file.as_deref(), level)?;

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| settings.store_path.clone());

    match cli.command {
        Command::Seed(args) => run_seed(args, &settings, &store_path),
        Command::Categories(args) => run_categories(args, &settings, &store_path),
        Command::Validate(args) => run_validate(args, &store_path),
        Command::Generate(args) => run_generate(args, &settings, &store_path),
        Command::Reroll(args) => run_reroll(args, &store_path),
        Command::SaveTemplate(args) => run_save_template(args, &store_path),
    }
}

fn run_seed(args: SeedArgs, settings: &Settings, store_path: &Path) -> Result<(), CliError> {
    let mut store = CatalogStore::load(store_path)?;
    let fixture = SeedFixture::load(&args.fixture)?;
    let report = store.seed(&fixture, &settings.group_map());
    let installed = if args.no_default_templates {
        false
    } else {
        store.install_default_templates()?
    };
    store.save(store_path)?;

    info!(
        event = "seed_finished",
        categories_added = report.categories_added,
        values_added = report.values_added,
        default_template_installed = installed
    );
    print_json(&json!({ "seed": report, "default_template_installed": installed }))
}

fn run_categories(
    args: CategoriesArgs,
    settings: &Settings,
    store_path: &Path,
) -> Result<(), CliError> {
    let store = CatalogStore::load(store_path)?;
    let groups = group_categories(store.categories(), &settings.group_order);

    if args.json {
        let groups: Vec<JsonValue> = groups
            .iter()
            .map(|group| json!({ "group": group.name, "categories": group.categories }))
            .collect();
        return print_json(&JsonValue::Array(groups));
    }

    for group in &groups {
        println!("{}", group.name);
        for category in &group.categories {
            println!("  {} ({} values)", category.name, category.values.len());
        }
    }
    Ok(())
}

fn run_validate(args: ConfigArgs, store_path: &Path) -> Result<(), CliError> {
    let store = CatalogStore::load(store_path)?;
    let config = load_configuration(&args, &store)?;
    let report = validate_configuration(&config, &store);

    print_json(&json!({ "ok": report.is_ok(), "report": report }))?;
    if !report.is_ok() {
        return Err(CliError::InvalidInput(format!(
            "configuration has {} error(s)",
            report.errors.len()
        )));
    }
    Ok(())
}

fn run_generate(args: GenerateArgs, settings: &Settings, store_path: &Path) -> Result<(), CliError> {
    let store = CatalogStore::load(store_path)?;
    let custom = match &args.source.config {
        Some(path) => Some(read_json(path)?),
        None => None,
    };
    let source = ConfigSource::from_request(args.source.template.as_deref(), custom);
    let players = clamp_players(
        args.players.unwrap_or(settings.default_players),
        settings.max_players,
    );

    let mut generator = ChallengeGenerator::new(&store, &store, source);
    if let Some(seed) = args.seed {
        generator = generator.with_seed(seed);
    }

    let timer = Instant::now();
    let outcome = generator.generate(players);
    let duration_ms = timer.elapsed().as_millis() as u64;
    let report = GenerationReport::from_outcome(&outcome, players, duration_ms);

    info!(
        event = "generate_finished",
        run_id = %report.run_id,
        players,
        errors = report.errors.len(),
        duration_ms
    );
    print_json(&json!({
        "players": outcome.players,
        "config": outcome.effective_config,
        "report": report,
    }))
}

fn run_reroll(args: RerollArgs, store_path: &Path) -> Result<(), CliError> {
    let store = CatalogStore::load(store_path)?;
    let rule: JsonValue = serde_json::from_str(&args.rule)?;

    let mut generator = ChallengeGenerator::for_reroll(&store);
    if let Some(seed) = args.seed {
        generator = generator.with_seed(seed);
    }
    let evaluation = generator.reroll_named(&args.category, &rule, args.num_values);

    print_json(&json!({
        "category": args.category,
        "values": evaluation.values,
        "errors": generator.errors(),
    }))
}

fn run_save_template(args: SaveTemplateArgs, store_path: &Path) -> Result<(), CliError> {
    let mut store = CatalogStore::load(store_path)?;
    let config = Configuration::from_json_str(&std::fs::read_to_string(&args.config)?)?;

    let report = validate_configuration(&config, &store);
    for issue in &report.errors {
        warn!(code = %issue.code, path = %issue.path, message = %issue.message, "saving template with errors");
    }

    let id = store
        .save_template(&args.name, args.description.as_deref(), &config)?
        .id;
    store.save(store_path)?;
    print_json(&json!({ "template_id": id, "name": args.name.trim() }))
}

fn load_configuration(args: &ConfigArgs, store: &CatalogStore) -> Result<Configuration, CliError> {
    match (&args.template, &args.config) {
        (Some(raw), _) => {
            let id: u64 = raw
                .trim()
                .parse()
                .map_err(|_| CliError::InvalidInput(format!("invalid template id '{raw}'")))?;
            let template = store
                .find_template_by_id(id)
                .ok_or_else(|| CliError::InvalidInput(format!("template with id {id} not found")))?;
            template
                .config()
                .map_err(|err| CliError::InvalidInput(format!("template {id}: {err}")))
        }
        (None, Some(path)) => Ok(Configuration::from_value(read_json(path)?)?),
        (None, None) => Err(CliError::InvalidInput(
            "use either --template or --config".to_string(),
        )),
    }
}

fn read_json(path: &Path) -> Result<JsonValue, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json(value: &JsonValue) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Keep the requested player count within `1..=max_players`.
fn clamp_players(requested: usize, max_players: usize) -> usize {
    let max_players = max_players.max(1);
    if requested < 1 {
        warn!(requested, "player count below 1, using 1");
        1
    } else if requested > max_players {
        warn!(requested, max_players, "player count above limit, clamping");
        max_players
    } else {
        requested
    }
}
