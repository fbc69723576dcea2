use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use mustache_pipeline::{
    Delimiters, DirectoryPartials, PartialsResolver, RenderOptions, render_file,
};

#[derive(Parser)]
#[command(
    name = "mustache-pipeline",
    about = "Render a Mustache template against JSON data"
)]
struct Cli {
    /// Path to the template file
    template: PathBuf,
    /// Path to a JSON file providing the data context (empty object when
    /// omitted)
    data: Option<PathBuf>,
    /// Directory to resolve {{>partials}} from
    #[arg(short, long)]
    partials: Option<PathBuf>,
    /// File extension of partials inside the partials directory
    #[arg(long, default_value = "mustache")]
    extension: String,
    /// Override the initial delimiter pair, e.g. "<% %>"
    #[arg(long)]
    delimiters: Option<String>,
    /// Cap intermediate render memory, in bytes
    #[arg(long)]
    budget: Option<usize>,
    /// Print render tracing to stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let data: serde_json::Value = match &cli.data {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read `{}`: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("invalid JSON in `{}`: {e}", path.display()))?
        }
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    let delimiters = match &cli.delimiters {
        Some(spec) => Some(parse_delimiter_spec(spec)?),
        None => None,
    };

    let partials = cli
        .partials
        .as_ref()
        .map(|dir| DirectoryPartials::with_extension(dir, cli.extension.clone()));

    let options = RenderOptions {
        delimiters,
        partials: partials.as_ref().map(|p| p as &dyn PartialsResolver),
        budget: cli.budget,
        debug: cli.debug,
    };

    let stdout = io::stdout();
    let mut sink = stdout.lock();
    render_file(&cli.template, &data, &mut sink, &options).map_err(|e| e.to_string())?;
    sink.flush().map_err(|e| e.to_string())
}

/// Parse a `"OPEN CLOSE"` delimiter override.
fn parse_delimiter_spec(spec: &str) -> Result<Delimiters, String> {
    let mut parts = spec.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(open), Some(close), None) => {
            Delimiters::new(open, close).ok_or_else(|| format!("invalid delimiter pair `{spec}`"))
        }
        _ => Err(format!("expected `OPEN CLOSE`, got `{spec}`")),
    }
}
