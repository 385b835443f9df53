use timestring::json::{self, JsonStyle};
use timestring::{load_units, Format, Position, Record, TimeError, UnitRegistry};

use std::io::{self, Read};
use std::process::ExitCode;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "\
usage: timestring [--units <file>] <command>

commands:
  render <template> [name=value ...]   render a template
  match <template>                     match stdin against a template
  convert <value> <from> <to>          convert between units
  units                                list known units and aliases";

enum Command {
    Render { template: String, pairs: Vec<String> },
    Match { template: String },
    Convert { value: String, from: String, to: String },
    Units,
}

impl Command {
    fn template(&self) -> Option<&str> {
        match self {
            Command::Render { template, .. } | Command::Match { template } => {
                Some(template.as_str())
            }
            _ => None,
        }
    }
}

struct Invocation {
    units_file: Option<String>,
    command: Command,
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&invocation) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err, invocation.command.template());
            ExitCode::from(1)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG`. Silent when it is unset.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(EnvFilter::from_default_env())
        .init();
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut rest = args;
    let mut units_file = None;

    if rest.first().map(String::as_str) == Some("--units") {
        let path = rest.get(1).ok_or("--units needs a file")?;
        units_file = Some(path.clone());
        rest = &rest[2..];
    }

    let (name, operands) = rest.split_first().ok_or("missing command")?;
    let command = match (name.as_str(), operands) {
        ("render", [template, pairs @ ..]) => Command::Render {
            template: template.clone(),
            pairs: pairs.to_vec(),
        },
        ("match", [template]) => Command::Match {
            template: template.clone(),
        },
        ("convert", [value, from, to]) => Command::Convert {
            value: value.clone(),
            from: from.clone(),
            to: to.clone(),
        },
        ("units", []) => Command::Units,
        ("render" | "match" | "convert" | "units", _) => {
            return Err(format!("wrong number of arguments for '{}'", name));
        }
        _ => return Err(format!("unknown command '{}'", name)),
    };

    Ok(Invocation {
        units_file,
        command,
    })
}

fn run(invocation: &Invocation) -> Result<String, TimeError> {
    let mut registry = UnitRegistry::default();
    if let Some(path) = &invocation.units_file {
        let text = std::fs::read_to_string(path)
            .map_err(|err| TimeError::InvalidInput(format!("Cannot read {}: {}", path, err)))?;
        load_units(&text, &mut registry)?;
    }

    match &invocation.command {
        Command::Render { template, pairs } => {
            let format = Format::new(template)?;
            Ok(format.render(&parse_record(pairs)?))
        }
        Command::Match { template } => {
            let format = Format::new(template)?;
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|err| TimeError::InvalidInput(format!("Cannot read stdin: {}", err)))?;
            let captures = format.captures(input.trim_end_matches(['\n', '\r']));
            json::to_json(&captures, JsonStyle::Pretty)
        }
        Command::Convert { value, from, to } => {
            let value = parse_number(value)?;
            Ok(registry.convert(value, from, to)?.to_string())
        }
        Command::Units => json::units_to_json(&registry, JsonStyle::Pretty),
    }
}

/// `name=value` arguments to a record.
fn parse_record(pairs: &[String]) -> Result<Record, TimeError> {
    let mut record = Record::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| {
                TimeError::InvalidInput(format!("Expected name=value, got '{}'", pair))
            })?;
        record.insert(name.to_string(), parse_number(value)?);
    }
    Ok(record)
}

fn parse_number(text: &str) -> Result<f64, TimeError> {
    text.trim()
        .parse()
        .map_err(|_| TimeError::InvalidInput(format!("'{}' is not a number", text)))
}

fn report(err: &TimeError, template: Option<&str>) {
    let (source, (start, end)) = match (template, err.span()) {
        (Some(source), Some(span)) => (source, span),
        _ => {
            eprintln!("error[{}]: {}", err.code(), err);
            return;
        }
    };

    let begin = Position::locate(source, start);
    let end = Position::locate(source, end);
    let line_text = source.lines().nth(begin.line).unwrap_or("");
    let line_len = line_text.chars().count();

    eprintln!("ERROR AT LINE {}:", begin.line + 1);
    eprintln!("{}", line_text);

    // Point errors and spans that leave the line underline to its end
    let start_col = begin.column;
    let end_col = if begin.line == end.line && end.column > start_col {
        end.column
    } else if start_col < line_len {
        line_len
    } else {
        start_col + 1
    };

    let mut underline = " ".repeat(start_col);
    underline.push('^');
    underline.push_str(&"_".repeat(end_col.saturating_sub(start_col + 1)));

    eprintln!("{}", underline);
    eprintln!("{}", err);
    eprintln!();
}
