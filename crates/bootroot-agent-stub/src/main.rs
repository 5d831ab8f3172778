//! No-op bootroot agent
//!
//! Stands in for the real agent in generated workspaces. Accepts any
//! arguments, performs no work and exits successfully.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bootroot-agent")]
#[command(about = "No-op stand-in for the bootroot agent", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    // Only emits when RUST_LOG asks for it.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Argument errors are ignored too.
    let args = Cli::try_parse().map(|cli| cli.args).unwrap_or_default();
    debug!(?args, "bootroot-agent stub invoked");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_arbitrary_flags() {
        let cli = Cli::try_parse_from([
            "bootroot-agent",
            "--config",
            "configs/edge-proxy.toml",
            "--oneshot",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.args.len(), 4);
        assert_eq!(cli.args[0], "--config");
    }

    #[test]
    fn test_accepts_help_as_plain_argument() {
        let cli = Cli::try_parse_from(["bootroot-agent", "--help"]).unwrap();
        assert_eq!(cli.args, vec!["--help".to_string()]);
    }

    #[test]
    fn test_accepts_no_arguments() {
        let cli = Cli::try_parse_from(["bootroot-agent"]).unwrap();
        assert!(cli.args.is_empty());
    }
}
