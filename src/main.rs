//! tactus - translate XML and HTML documents into braille annotations

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use tactus::translator::{AsciiBrailleTranslator, DEFAULT_TABLE, RecordingTranslator};
use tactus::{
    Action, Document, Engine, EngineOptions, Registry, parse_html_bytes, parse_xml_bytes, to_xml_string,
};

#[derive(Parser)]
#[command(name = "tactus")]
#[command(version, about = "Translate document trees into braille annotations", long_about = None)]
#[command(after_help = "EXAMPLES:
    tactus book.xml                       Translate with the default action map
    tactus -m map.xml book.xml -o out.xml Translate with an action map
    tactus --json -m map.xml page.html    Print a pass report as JSON")]
struct Cli {
    /// Input document (XML, or HTML by extension or --html)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Action map (XML). Without one every element passes through.
    #[arg(short, long, value_name = "FILE")]
    map: Option<PathBuf>,

    /// Translation table, repeatable
    #[arg(short, long = "table", value_name = "NAME")]
    tables: Vec<String>,

    /// Write the annotated document here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Parse the input as HTML
    #[arg(long)]
    html: bool,

    /// Print the pass report as JSON
    #[arg(long)]
    json: bool,

    /// Do not stamp elements with the action applied to them
    #[arg(long)]
    no_trace: bool,

    /// Braille cell for characters the built-in translator cannot handle
    #[arg(long, value_name = "CHAR")]
    fallback: Option<char>,

    /// Print every translator call to stderr
    #[arg(long)]
    trace_batches: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<(), String> {
    let registry = match &cli.map {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
            Registry::from_xml(&source).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => Registry::builder(Action::Generic)
            .build()
            .map_err(|e| e.to_string())?,
    };

    let tables = if cli.tables.is_empty() {
        vec![DEFAULT_TABLE.to_string()]
    } else {
        cli.tables.clone()
    };

    // The built-in translator only accepts table names it has been told about.
    let mut translator = AsciiBrailleTranslator::new()
        .with_tables(tables.iter().cloned())
        .with_tables(registry.block_tables());
    if let Some(cell) = cli.fallback {
        translator = translator.with_fallback(cell);
    }
    let options = EngineOptions::new()
        .with_tables(tables)
        .with_stamp_trace(!cli.no_trace);
    let engine = Engine::new(registry, RecordingTranslator::new(translator)).with_options(options);

    let mut doc = load_document(&cli.input, cli.html)?;
    let report = engine.translate_document(&mut doc).map_err(|e| e.to_string())?;

    if cli.trace_batches {
        for (i, call) in engine.translator().calls().iter().enumerate() {
            eprintln!("call {i}: {:?} tables={:?}", call.text, call.tables);
        }
    }

    let xml = to_xml_string(&doc).map_err(|e| e.to_string())?;
    match &cli.output {
        Some(path) => fs::write(path, xml).map_err(|e| format!("{}: {e}", path.display()))?,
        None if !cli.json => println!("{xml}"),
        None => {}
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else if !cli.quiet {
        log::info!(
            "{} spans, {} translator calls, {} annotations",
            report.spans,
            report.translator_calls,
            report.annotations
        );
    }
    Ok(())
}

fn load_document(path: &Path, force_html: bool) -> Result<Document, String> {
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let is_html = force_html
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));

    if is_html {
        Ok(parse_html_bytes(&bytes))
    } else {
        parse_xml_bytes(&bytes).map_err(|e| format!("{}: {e}", path.display()))
    }
}
