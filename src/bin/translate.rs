//! Translate binary - runs one translation and prints the normalized result
//!
//! Usage:
//!   cargo run --bin translate -- "text to translate"
//!   cargo run --bin translate -- --from French --to Polish "bonjour"
//!   cargo run --bin translate -- --pronounce --to Polish "dzień dobry"
//!
//! Optional environment variables:
//! - TRANSLATE_API_URL
//! - PRONOUNCE_API_URL
//! - TRANSLATE_TIMEOUT_SECS (defaults to 10)
//! - DEFAULT_SOURCE_LANGUAGE (defaults to Auto-detect)
//! - DEFAULT_TARGET_LANGUAGE (defaults to English)

use anyhow::{bail, Context, Result};
use smart_translator::config::Config;
use smart_translator::i18n::Language;
use smart_translator::translation::{TranslationClient, TranslationParams};
use tracing::info;

struct Args {
    from: Option<String>,
    to: Option<String>,
    pronounce: bool,
    text: String,
}

fn parse_args() -> Result<Args> {
    let mut from = None;
    let mut to = None;
    let mut pronounce = false;
    let mut words = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--from" => from = Some(args.next().context("--from needs a language")?),
            "--to" => to = Some(args.next().context("--to needs a language")?),
            "--pronounce" => pronounce = true,
            _ => words.push(arg),
        }
    }

    if words.is_empty() {
        bail!("Usage: translate [--from LANGUAGE] [--to LANGUAGE] [--pronounce] TEXT");
    }

    Ok(Args {
        from,
        to,
        pronounce,
        text: words.join(" "),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smart_translator=info".parse()?),
        )
        .init();

    let args = parse_args()?;
    let config = Config::from_env()?;
    let client = TranslationClient::new(&config)?;

    let params = TranslationParams {
        source_language: args.from.or(Some(config.default_source_language.clone())),
        target_language: args.to.or(Some(config.default_target_language.clone())),
    };

    if args.pronounce {
        let language = params
            .target_language
            .as_deref()
            .and_then(Language::resolve)
            .filter(|language| !language.is_auto_detect())
            .unwrap_or(Language::ENGLISH);
        println!("{}", client.pronunciation_url(&args.text, language));
        return Ok(());
    }

    info!("Translating {} characters", args.text.chars().count());
    let result = client.translate(&args.text, &params).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
