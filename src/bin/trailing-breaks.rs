use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::{fs, process};
use trailing_breaks::editor::ClipboardPayload;
use trailing_breaks::{
    Editor, EditorError, EditorState, ExportConfig, TrailingBreakPlugin, TransformError, basic,
    remove_trailing_breaks_json,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log decisions to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document JSON file as HTML
    Export {
        path: PathBuf,
        /// Skip trailing break markers
        #[arg(long)]
        plain: bool,
    },
    /// Print what copying a range of a document puts on the clipboard
    Copy {
        path: PathBuf,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
        #[arg(long)]
        json: bool,
    },
    /// Parse an HTML file into document JSON
    Import { path: PathBuf },
    /// Remove trailing break markers from node, fragment or slice JSON
    Strip { path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Model(#[from] trailing_breaks::ModelError),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Export { path, plain } => export_command(path, *plain),
        Commands::Copy {
            path,
            from,
            to,
            json,
        } => copy_command(path, *from, *to, *json),
        Commands::Import { path } => import_command(path),
        Commands::Strip { path } => strip_command(path),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(&read(path)?).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn load_editor(path: &Path) -> Result<Editor, CliError> {
    let schema = basic::schema()?;
    let state = EditorState::from_json(schema, &read_json(path)?)?;
    Ok(Editor::new(state).with_plugin(TrailingBreakPlugin))
}

fn export_command(path: &Path, plain: bool) -> Result<(), CliError> {
    let editor = load_editor(path)?;
    let config = if plain {
        ExportConfig::plain()
    } else {
        ExportConfig::with_trailing_breaks()
    };
    println!("{}", editor.get_html_with(config));
    Ok(())
}

fn copy_command(path: &Path, from: usize, to: usize, json: bool) -> Result<(), CliError> {
    let editor = load_editor(path)?;
    let payload: ClipboardPayload = editor.copy(from, to)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        println!("{}", payload.html);
    }
    Ok(())
}

fn import_command(path: &Path) -> Result<(), CliError> {
    let state = EditorState::from_html(basic::schema()?, &read(path)?)?;
    let json = state.doc().to_json();
    println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
    Ok(())
}

fn strip_command(path: &Path) -> Result<(), CliError> {
    let schema = basic::schema()?;
    let stripped = remove_trailing_breaks_json(&schema, &read_json(path)?)?;
    println!("{}", serde_json::to_string_pretty(&stripped).unwrap_or_default());
    Ok(())
}
