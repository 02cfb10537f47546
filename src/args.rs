//! Command-line parsing.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("Invalid number for {option}: {value}")]
    InvalidNumber { option: String, value: String },

    #[error("Invalid edit '{0}', expected ROW,COL=TEXT")]
    InvalidEdit(String),
}

/// Something to do to the grid, in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Edit { row: usize, col: usize, text: String },
    Macro(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Cli {
    pub file: Option<PathBuf>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub actions: Vec<Action>,
    pub output: Option<PathBuf>,
    pub print: bool,
    pub no_prelude: bool,
    pub config: Option<PathBuf>,
    pub help: bool,
}

pub fn print_usage() {
    eprintln!("Usage: gridmacro [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Grid to open (.json or .xlsx)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rows <N>                Initial row count (1-100)");
    eprintln!("  --cols <N>                Initial column count (1-100)");
    eprintln!("  -e, --edit <ROW,COL=TEXT> Commit text to a cell (can be repeated)");
    eprintln!("  -m, --macro <FILE>        Run a macro file (can be repeated)");
    eprintln!("  -o, --output <FILE>       Save the grid (.json or .xlsx)");
    eprintln!("  --print                   Print the grid as tab-separated values");
    eprintln!("  --config <FILE>           Read settings from FILE");
    eprintln!("  --no-prelude              Do not run prelude.rhai at startup");
    eprintln!("  -h, --help                Print help");
}

fn parse_edit(edit: &str) -> Result<Action, ArgError> {
    let invalid = || ArgError::InvalidEdit(edit.to_string());
    let (coords, text) = edit.split_once('=').ok_or_else(invalid)?;
    let (row, col) = coords.split_once(',').ok_or_else(invalid)?;
    Ok(Action::Edit {
        row: row.trim().parse().map_err(|_| invalid())?,
        col: col.trim().parse().map_err(|_| invalid())?,
        text: text.to_string(),
    })
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, ArgError> {
    let args: Vec<String> = args.into_iter().collect();
    let mut cli = Cli::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| ArgError::MissingValue(arg.to_string()))
        };
        let number = |v: String| {
            v.parse::<usize>().map_err(|_| ArgError::InvalidNumber {
                option: arg.to_string(),
                value: v,
            })
        };

        match arg {
            "-h" | "--help" => cli.help = true,
            "--rows" => cli.rows = Some(number(value()?)?),
            "--cols" => cli.cols = Some(number(value()?)?),
            "-e" | "--edit" => cli.actions.push(parse_edit(&value()?)?),
            "-m" | "--macro" => cli.actions.push(Action::Macro(PathBuf::from(value()?))),
            "-o" | "--output" => cli.output = Some(PathBuf::from(value()?)),
            "--config" => cli.config = Some(PathBuf::from(value()?)),
            "--print" => cli.print = true,
            "--no-prelude" => cli.no_prelude = true,
            other if other.starts_with('-') => {
                return Err(ArgError::UnknownOption(other.to_string()));
            }
            other => {
                if cli.file.is_some() {
                    return Err(ArgError::UnexpectedArgument(other.to_string()));
                }
                cli.file = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }
    Ok(cli)
}
