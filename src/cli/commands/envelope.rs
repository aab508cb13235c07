use crate::cli::utils::{codec_from_env, output_success, parse_json_arg};
use crate::cli::OutputFormat;
use crate::envelope::EnvelopeKey;

pub fn keygen(output_format: OutputFormat) -> anyhow::Result<()> {
    let key = EnvelopeKey::generate_hex();
    output_success(output_format, "Generated envelope key", Some(key.into()))
}

pub fn seal(raw: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let payload = parse_json_arg(raw)?;
    let envelope = codec_from_env()?.encrypt(&payload)?;
    output_success(output_format, "Sealed payload", Some(envelope.to_value()))
}

pub fn open(raw: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let envelope = parse_json_arg(raw)?;
    let payload = codec_from_env()?.decrypt_value(&envelope)?;
    output_success(output_format, "Opened payload", Some(payload.into()))
}
