use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::envelope::{EnvelopeCodec, EnvelopeKey};

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "status": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => match data {
            Some(Value::String(s)) => println!("{}", s),
            Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
            None => println!("✓ {}", message),
        },
    }
    Ok(())
}

/// Parse a JSON command-line argument
pub fn parse_json_arg(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid JSON argument: {}", e))
}

/// Codec for the envelope key in the environment (`API_SECRET_KEY`)
pub fn codec_from_env() -> anyhow::Result<EnvelopeCodec> {
    let config = AppConfig::from_env();
    let key = EnvelopeKey::parse(config.security.envelope_key.as_bytes())?;
    Ok(EnvelopeCodec::new(key))
}
