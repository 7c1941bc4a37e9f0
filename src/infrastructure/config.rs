use crate::application::fault_tracker::MAX_FAULT_LOG_LENGTH;
use crate::application::history_store::MAX_HISTORY_LENGTH;
use crate::domain::sample::KeyConvention;
use config::{builder::DefaultState, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub telemetry: TelemetrySettings,
    pub events: EventSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    pub history_capacity: usize,
    pub fault_capacity: usize,
    pub key_convention: KeyConvention,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventSettings {
    pub channel_capacity: usize,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load settings from defaults, `config/server.toml` and `TELEMETRY__*` env vars.
pub fn load_settings() -> anyhow::Result<Settings> {
    let builder = defaults()?
        .add_source(File::with_name("config/server").required(false))
        .add_source(
            Environment::with_prefix("TELEMETRY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

    finish(builder)
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.cors_origins", vec!["http://localhost:5173"])?
        .set_default("telemetry.history_capacity", MAX_HISTORY_LENGTH as u64)?
        .set_default("telemetry.fault_capacity", MAX_FAULT_LOG_LENGTH as u64)?
        .set_default("telemetry.key_convention", "abbreviated")?
        .set_default("events.channel_capacity", 1024)?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;

    anyhow::ensure!(
        settings.telemetry.history_capacity > 0,
        "telemetry.history_capacity must be at least 1"
    );
    anyhow::ensure!(
        settings.telemetry.fault_capacity > 0,
        "telemetry.fault_capacity must be at least 1"
    );
    anyhow::ensure!(
        settings.events.channel_capacity > 0,
        "events.channel_capacity must be at least 1"
    );

    Ok(settings)
}
