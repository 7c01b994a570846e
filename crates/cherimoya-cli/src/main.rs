use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cherimoya_auth::{
    AudienceCheck, AuthConfig, AuthEvent, Authorizer, ENV_AWS_REGION, ENV_USER_POOL_CLIENT_ID,
    ENV_USER_POOL_ID, HttpKeyResolver, TracingLogger, VerifyOptions,
};
use cherimoya_log::{LogFormat, LoggerOptions, parse_level, setup_logger};

#[derive(Debug, Parser)]
#[command(name = "cherimoya", about = "Run the token authorizer against a gateway event")]
struct Cli {
    /// Print full JSON documents instead of a one-line summary
    #[arg(long, global = true)]
    json: bool,

    /// TOML file with user_pool_id, user_pool_client_id and aws_region
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    user_pool_id: Option<String>,

    #[arg(long, global = true)]
    client_id: Option<String>,

    #[arg(long, global = true)]
    region: Option<String>,

    /// When to check the token audience
    #[arg(long, global = true, value_enum, default_value_t = Audience::Heuristic)]
    audience: Audience,

    /// Timeout for the key set fetch, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log level (overrides LOGLEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the allow/deny document for an event
    Authorize {
        /// Event JSON file, or `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },
    /// Print the caller identity for an event, or null
    Identity {
        /// Event JSON file, or `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },
    /// Print the issuer and key set URL for the configuration
    Issuer,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Audience {
    /// Only when the raw token contains `access_token`
    Heuristic,
    Always,
    Never,
}

impl From<Audience> for AudienceCheck {
    fn from(a: Audience) -> Self {
        match a {
            Audience::Heuristic => AudienceCheck::AccessTokenHeuristic,
            Audience::Always => AudienceCheck::Always,
            Audience::Never => AudienceCheck::Never,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_opts = LoggerOptions::default().format(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });
    if let Some(level) = &cli.log_level {
        log_opts = log_opts.level(parse_level(level)?);
    }
    setup_logger(log_opts)?;

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Issuer => {
            pout(
                cli.json,
                serde_json::json!({"issuer": config.issuer(), "jwks_url": config.jwks_url()}),
                &format!("{}\n{}", config.issuer(), config.jwks_url()),
            )?;
        }
        Commands::Authorize { event } => {
            let event = read_event(event)?;
            let response = authorizer(&cli, config).authorize(&event, &TracingLogger);
            let summary = format!(
                "{:?} {} on {}",
                response.effect(),
                response.principal_id,
                response.resource()
            );
            pout(cli.json, serde_json::to_value(&response)?, &summary)?;
        }
        Commands::Identity { event } => {
            let event = read_event(event)?;
            let identity = authorizer(&cli, config).get_identity(&event, &TracingLogger);
            let summary = identity.as_ref().map_or_else(
                || "anonymous".to_string(),
                |id| format!("{} groups={:?}", id.user_id, id.groups),
            );
            pout(cli.json, serde_json::to_value(&identity)?, &summary)?;
        }
    }

    Ok(())
}

fn authorizer(cli: &Cli, config: AuthConfig) -> Authorizer<HttpKeyResolver> {
    let mut resolver = HttpKeyResolver::new();
    if let Some(secs) = cli.timeout_secs {
        resolver = resolver.with_timeout(Duration::from_secs(secs));
    }
    Authorizer::new(config, resolver).with_options(VerifyOptions {
        audience: cli.audience.into(),
    })
}

/// Flags, then the `--config` file, then the environment, field by field.
fn load_config(cli: &Cli) -> anyhow::Result<AuthConfig> {
    let file = match &cli.config {
        Some(path) => Some(AuthConfig::from_file(path)?),
        None => None,
    };

    let lookup = |name: &str| {
        let (flag, from_file) = match name {
            ENV_USER_POOL_ID => (&cli.user_pool_id, file.as_ref().map(|f| &f.user_pool_id)),
            ENV_USER_POOL_CLIENT_ID => (
                &cli.client_id,
                file.as_ref().map(|f| &f.user_pool_client_id),
            ),
            ENV_AWS_REGION => (&cli.region, file.as_ref().map(|f| &f.aws_region)),
            _ => return None,
        };
        flag.clone()
            .or_else(|| from_file.cloned())
            .or_else(|| std::env::var(name).ok())
    };

    AuthConfig::from_lookup(lookup)
        .context("pass --user-pool-id/--client-id/--region, --config, or set the environment")
}

fn read_event(path: &Path) -> anyhow::Result<AuthEvent> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).context("event is not valid JSON")
}

fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
