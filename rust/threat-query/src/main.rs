use anyhow::{bail, Context};
use std::io::Read;
use threat_query::{
    config::ConnectorConfig, mapping::JsonFieldMapper, pattern::FilterNode, telemetry,
    translate_pattern, Dialect,
};

/// Reads a JSON pattern tree from stdin and prints one serialized payload per line.
fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("threat_query=info");
    let config = ConnectorConfig::from_env()?;

    let Some(source) = std::env::args().nth(1) else {
        bail!("usage: threat-query <dnsEventData|tideDbData|dossierData> < pattern.json");
    };
    let dialect: Dialect = source.parse()?;

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read pattern from stdin")?;
    let pattern: FilterNode =
        serde_json::from_str(&raw).context("failed to decode pattern tree")?;

    for payload in translate_pattern(&pattern, dialect, JsonFieldMapper::bundled(dialect), &config)? {
        println!("{payload}");
    }
    Ok(())
}
