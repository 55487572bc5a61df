use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use ptree::{Error, Format, ParseError, XmlOptions};

/// Convert a document between JSON, XML and INI.
#[derive(Debug, Parser)]
#[command(name = "ptree", version, about)]
struct Cli {
    /// Input format; inferred from the file extension when omitted
    #[arg(long, short)]
    from: Option<Format>,

    /// Output format
    #[arg(long, short, default_value = "json")]
    to: Format,

    /// Key under which XML attributes are folded
    #[arg(long, default_value = ptree::options::DEFAULT_ATTRIBUTE_PLACEHOLDER)]
    placeholder: String,

    /// Input file; stdin when omitted
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Parse(err)) => {
            report(&err);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ptree::Result<()> {
    let from = match (cli.from, &cli.file) {
        (Some(format), _) => format,
        (None, Some(path)) => infer_format(path)?,
        (None, None) => Format::Json,
    };

    let mut options = XmlOptions::default().with_attribute_placeholder(cli.placeholder.clone());
    if let Some(path) = &cli.file {
        options = options.with_filename(path.display().to_string());
    }

    let input = match &cli.file {
        Some(path) => io::read_to_string(File::open(path)?)?,
        None => io::read_to_string(io::stdin().lock())?,
    };
    debug!("converting {from} to {}", cli.to);

    let tree = from.parse(&input, &options)?;
    let output = cli.to.serialize(&tree, &options)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

fn infer_format(path: &Path) -> ptree::Result<Format> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Format::from_extension)
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot infer the format of {}; pass --from", path.display()),
            ))
        })
}

/// The offending line with a caret under the column, then the message.
fn report(err: &ParseError) {
    let cursor = &err.cursor;
    if let Some(filename) = &cursor.filename {
        eprintln!("{filename}:");
    }
    eprintln!("ERROR AT LINE {}:", cursor.line + 1);
    eprintln!("{}", cursor.line_text);

    let mut underline = String::new();
    for c in cursor.line_text.chars().take(cursor.column) {
        underline.push(if c == '\t' { '\t' } else { ' ' });
    }
    underline.push('^');
    eprintln!("{underline}");
    eprintln!("{}", err.message);
}
