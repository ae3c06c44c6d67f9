use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use serde_json::{Map, Value, json};

use weather_core::{
    Config, Fulfillment, ResponseComposer, ResponseFormat,
    payload::{CITY_PARAM, CONDITION_PARAM, DATE_TIME_PARAM, TEMPERATURE_PARAM, WIND_SPEED_PARAM},
    provider_from_config,
};

use crate::{
    logging::{LoggingConfig, init_logging},
    server::{self, AppState},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-webhook",
    version,
    about = "Weather fulfillment webhook for conversational agents"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP webhook.
    Serve {
        /// Address to listen on, e.g. "127.0.0.1:8080".
        #[arg(long)]
        bind: Option<String>,
    },

    /// Interactively set the OpenWeather API key and reply format.
    Configure,

    /// Answer one question locally and print the reply.
    Ask {
        /// City name.
        city: String,

        /// Date or date-time; if absent, means today.
        #[arg(long)]
        date: Option<String>,

        /// Only report this weather condition (repeatable).
        #[arg(long = "condition", value_name = "KEYWORD")]
        conditions: Vec<String>,

        /// Only report the temperature span.
        #[arg(long, value_name = "KEYWORD")]
        temperature: Option<String>,

        /// Only report the wind speed span.
        #[arg(long, value_name = "KEYWORD")]
        wind_speed: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config.as_deref();

        match self.command {
            Command::Configure => {
                let path = match config_path {
                    Some(p) => p.to_path_buf(),
                    None => Config::config_file_path()?,
                };
                configure(&path)
            }
            Command::Serve { bind } => {
                let config = Config::load(config_path)?;
                init_logging(&LoggingConfig::from_config(&config))?;

                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                let state = AppState {
                    fulfillment: fulfillment_from(&config)?,
                };
                server::serve(state, &bind)
                    .await
                    .with_context(|| format!("Webhook server failed on {bind}"))
            }
            Command::Ask {
                city,
                date,
                conditions,
                temperature,
                wind_speed,
            } => {
                let config = Config::load(config_path)?;
                init_logging(&LoggingConfig::from_config(&config))?;

                let payload = ask_payload(
                    &city,
                    date.as_deref(),
                    &conditions,
                    temperature.as_deref(),
                    wind_speed.as_deref(),
                );
                let response = fulfillment_from(&config)?.handle(payload).await;
                println!("{}", response.fulfillment_text());
                Ok(())
            }
        }
    }
}

fn fulfillment_from(config: &Config) -> anyhow::Result<Fulfillment> {
    let provider = provider_from_config(config)?;
    Ok(Fulfillment::new(
        Arc::from(provider),
        ResponseComposer::new(config.response.format),
    ))
}

fn configure(path: &std::path::Path) -> anyhow::Result<()> {
    let mut config = Config::load_file(path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    } else if !config.is_provider_configured() {
        anyhow::bail!("An OpenWeather API key is required.");
    }

    let formats = ResponseFormat::all().to_vec();
    let current = formats
        .iter()
        .position(|f| *f == config.response.format)
        .unwrap_or_default();
    config.response.format = Select::new("Reply format:", formats)
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read reply format")?;

    let written = config.save(Some(path))?;
    println!("Configuration saved to {}", written.display());
    Ok(())
}

/// Build the agent request `ask` would have received over the webhook.
fn ask_payload(
    city: &str,
    date: Option<&str>,
    conditions: &[String],
    temperature: Option<&str>,
    wind_speed: Option<&str>,
) -> Value {
    let mut parameters = Map::new();
    parameters.insert(CITY_PARAM.to_string(), json!(city));
    if let Some(date) = date {
        parameters.insert(DATE_TIME_PARAM.to_string(), json!(date));
    }
    if !conditions.is_empty() {
        parameters.insert(CONDITION_PARAM.to_string(), json!(conditions));
    }
    if let Some(temperature) = temperature {
        parameters.insert(TEMPERATURE_PARAM.to_string(), json!([temperature]));
    }
    if let Some(wind_speed) = wind_speed {
        parameters.insert(WIND_SPEED_PARAM.to_string(), json!([wind_speed]));
    }

    json!({
        "responseId": "cli",
        "queryResult": {
            "queryText": format!("weather in {city}"),
            "action": "weather.forecast",
            "parameters": parameters,
        }
    })
}
