use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use docrender::{Config, Format};

#[derive(Parser)]
#[command(name = "docrender")]
#[command(about = "Convert generated Markdown documentation to PDF or DOCX")]
struct Cli {
    /// Input Markdown file, or `-` to read from stdin
    input: PathBuf,

    /// Output file (defaults to input name with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pdf)]
    format: Format,

    /// TOML file overriding the built-in style palette
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the generated Typst markup instead of writing a file
    #[arg(long)]
    typst: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| fail(e)),
        None => Config::compiled_default(),
    };

    let markdown = read_input(&cli.input).unwrap_or_else(|e| {
        fail(format!("Error reading {}: {}", cli.input.display(), e))
    });
    if markdown.trim().is_empty() {
        fail("No documentation provided");
    }

    if cli.typst {
        print!("{}", docrender::markdown_to_typst_with_config(&markdown, &config));
        return;
    }

    let doc = docrender::parse(&markdown);
    log::info!("parsed {} blocks from {}", doc.len(), cli.input.display());

    let bytes = cli
        .format
        .renderer(config)
        .render(&doc)
        .unwrap_or_else(|e| fail(format!("Error: {e}")));

    let output = cli
        .output
        .unwrap_or_else(|| default_output(&cli.input, cli.format));

    if let Err(e) = fs::write(&output, bytes) {
        fail(format!("Error writing {}: {}", output.display(), e));
    }

    println!("Created {}", output.display());
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        fs::read_to_string(path)
    }
}

fn default_output(input: &Path, format: Format) -> PathBuf {
    if input == Path::new("-") {
        PathBuf::from(format!("document.{}", format.extension()))
    } else {
        input.with_extension(format.extension())
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}
