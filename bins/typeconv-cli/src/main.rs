use clap::Parser;
use typeconv_api::{Type, Value};
use typeconv_engine::{Engine, EngineConfig, config::CONFIG_ENV};

#[derive(Parser)]
#[command(name = "typeconv", about = "Convert a JSON value to a target type")]
struct Cli {
    /// Target type, e.g. `i32` or `Mapping<string, List<f64>>`.
    #[arg(long = "type", short = 't', required_unless_present = "list")]
    ty: Option<String>,

    /// Path to TOML configuration file.
    #[arg(long, env = CONFIG_ENV)]
    config: Option<String>,

    /// JSON value to print instead of failing.
    #[arg(long)]
    default: Option<String>,

    /// List the registry after resolving `--type` (if given) and exit.
    #[arg(long)]
    list: bool,

    /// Input as JSON. Text that is not valid JSON is taken as a string.
    input: Option<String>,
}

fn parse_json(text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(text),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "failed to load config");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    let engine = Engine::builder().config(config).with_builtins().build();

    let target = match cli.ty.as_deref().map(Type::parse).transpose() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("invalid type: {e}");
            std::process::exit(2);
        }
    };

    if cli.list {
        if let Some(ty) = &target {
            engine.resolve(ty);
        }
        for (ty, origin) in engine.registered_types() {
            println!("{ty}\t{origin}");
        }
        return;
    }

    let Some(target) = target else {
        eprintln!("--type is required");
        std::process::exit(2);
    };
    let input = parse_json(cli.input.as_deref().unwrap_or("null"));

    if let Some(default) = &cli.default {
        let value = engine.convert_or(&input, &target, parse_json(default));
        println!("{value}");
        return;
    }

    match engine.convert(&input, &target) {
        Ok(value) => println!("{value}"),
        Err(e) => {
            eprintln!("{e}");
            for diag in &e.diagnostics {
                eprintln!("  {diag:?}");
            }
            std::process::exit(1);
        }
    }
}
