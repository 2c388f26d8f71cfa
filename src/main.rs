use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "HARMONY_LOG";
const DEFAULT_LOG_FILTER: &str = "harmony=info";

#[derive(Debug, Default)]
struct CliArgs {
    config_dir: Option<PathBuf>,
    imports: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = parse_args(std::env::args().skip(1).collect())?;

    harmony::app::run_with_startup(harmony::app::AppStartupOptions {
        config_dir: args.config_dir,
        imports: args.imports,
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--config-dir" => {
                index += 1;
                out.config_dir = Some(PathBuf::from(required_value(&args, index, "--config-dir")?));
            }
            "--import" => {
                index += 1;
                out.imports
                    .push(PathBuf::from(required_value(&args, index, "--import")?));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn required_value<'a>(args: &'a [String], index: usize, flag: &str) -> anyhow::Result<&'a str> {
    let Some(value) = args.get(index) else {
        anyhow::bail!("{flag} requires a path");
    };
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(value)
}

fn print_help() {
    println!("Harmony");
    println!("  --config-dir <dir>   Directory holding state.json");
    println!("  --import <dir>       Add audio files under <dir> at startup (repeatable)");
    println!("  HARMONY_LOG          Log filter, default {DEFAULT_LOG_FILTER}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn imports_are_repeatable() {
        let parsed = parse_args(args(&["--import", "a", "--config-dir", "cfg", "--import", "b"]))
            .expect("parse");
        assert_eq!(parsed.imports, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(parsed.config_dir, Some(PathBuf::from("cfg")));
    }

    #[test]
    fn missing_and_unknown_values_are_rejected() {
        assert!(parse_args(args(&["--import"])).is_err());
        assert!(parse_args(args(&["--config-dir", "  "])).is_err());
        assert!(parse_args(args(&["--host"])).is_err());
    }
}
