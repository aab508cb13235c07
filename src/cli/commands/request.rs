use clap::Args;
use reqwest::Method;
use serde_json::Value;

use crate::cli::utils::{codec_from_env, output_success, parse_json_arg};
use crate::cli::OutputFormat;
use crate::middleware::payload::{looks_sealed, API_KEY_HEADER};

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[arg(help = "Request path, e.g. /api/data/trainers?limit=5")]
    pub path: String,

    #[arg(short = 'X', long, default_value = "GET", help = "HTTP method")]
    pub method: String,

    #[arg(short, long, help = "JSON body, sealed before sending unless --plain")]
    pub body: Option<String>,

    #[arg(short, long, env = "API_TOKEN", help = "Bearer token")]
    pub token: Option<String>,

    #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:3000", help = "Server base URL")]
    pub url: String,

    #[arg(long, help = "Send the DEV_KEY header and plain JSON")]
    pub plain: bool,
}

pub async fn handle(args: RequestArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let codec = codec_from_env()?;
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())?;
    let url = format!("{}{}", args.url.trim_end_matches('/'), args.path);

    let mut request = reqwest::Client::new().request(method, &url);
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }
    if args.plain {
        let dev_key = std::env::var("DEV_KEY").map_err(|_| anyhow::anyhow!("DEV_KEY is not set"))?;
        request = request.header(API_KEY_HEADER, dev_key);
    }
    if let Some(raw) = &args.body {
        let body = parse_json_arg(raw)?;
        let body = if args.plain { body } else { codec.encrypt(&body)?.to_value() };
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let mut reply: Value = response.json().await?;

    // Sealed `data` is opened for display
    if let Some(data) = reply.get("data").filter(|d| looks_sealed(d)).cloned() {
        reply["data"] = codec.decrypt_value(&data)?.into();
    }

    output_success(output_format, &format!("{} {}", status, url), Some(reply))
}
