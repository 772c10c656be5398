//! `mailstamp`: render a named email template and send it over SMTP.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use mailstamp::{Config, FuncMap, Mailer, TemplateData, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mailstamp")]
#[command(version, about = "Render a named email template and send it over SMTP", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "MAILSTAMP_CONFIG", default_value = "mailstamp.json")]
    config: PathBuf,

    /// Template directory, overriding the configuration file
    #[arg(long)]
    template_path: Option<PathBuf>,

    /// SMTP password, overriding the configuration file
    #[arg(long, env = "MAILSTAMP_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    /// Recipient address
    #[arg(long)]
    to: String,

    /// Recipient display name
    #[arg(long, default_value = "")]
    to_name: String,

    /// Template name (a directory below the template path)
    #[arg(short, long)]
    template: String,

    /// Template data as a JSON object, available as `data`
    #[arg(short, long, default_value = "{}")]
    data: String,

    /// Print the composed message instead of sending it
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(path) = &self.template_path {
            config.template_path.clone_from(path);
        }
        if let Some(password) = &self.smtp_password {
            config.smtp.password.clone_from(password);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailstamp=info,mailstamp_smtp=info,mailstamp_cli=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_json_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let config = cli.apply_overrides(config);
    let data = parse_data(&cli.data)?;
    let functions = template_functions();
    let mailer = Mailer::new(config);

    if cli.dry_run {
        let composed = mailer
            .compose(
                &cli.to_name,
                &cli.to,
                &cli.template,
                &data,
                &functions,
                &functions,
            )
            .await?;
        tracing::info!(message_id = %composed.message_id, "Dry run, message not sent");

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&composed.raw)?;
        stdout.write_all(b"\r\n")?;
        stdout.flush()?;
        return Ok(());
    }

    let result = mailer
        .send_mail(
            &cli.to_name,
            &cli.to,
            &cli.template,
            &data,
            &functions,
            &functions,
        )
        .await
        .with_context(|| format!("Failed to send template '{}' to {}", cli.template, cli.to))?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Parses `--data`, which must be a JSON object.
fn parse_data(json: &str) -> Result<TemplateData> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).context("--data must be a JSON object")?;
    Ok(object
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
        .collect())
}

/// Helpers available to every template.
fn template_functions() -> FuncMap {
    FuncMap::new().with("current_year", current_year)
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}
