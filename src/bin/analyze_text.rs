use anyhow::{bail, Context, Result};
use draftcheck_lib::models::{DocumentDetectRequest, SentenceDetectRequest};
use draftcheck_lib::services::config_store::{ConfigStore, DocumentFallback};
use draftcheck_lib::services::store::InMemoryStore;
use draftcheck_lib::services::text_processor::{compute_text_metrics, segment};
use draftcheck_lib::api::DraftCheckApi;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1].starts_with("--") {
        eprintln!(
            "Usage:\n  analyze_text <path.txt> [--previous <path.txt>] [--sentences] [--segments-only] [--degraded] [--config-dir <dir>] [--detector-url <url>] [--out <json_path>]\n\nNotes:\n  - Document scope fails when the detector is unreachable unless --degraded is given.\n  - Sentence scope (--sentences) always completes; unreachable sentences are scored locally.\n  - DRAFTCHECK_DETECTOR_URL and DRAFTCHECK_SENTENCE_DETECTOR_URL override the config file."
        );
        return Ok(());
    }

    draftcheck_lib::init_logging();

    let path = args[1].clone();
    let text = std::fs::read_to_string(&path).with_context(|| format!("read {} failed", path))?;
    let previous_text = match parse_arg_value(&args, "--previous") {
        Some(p) => Some(std::fs::read_to_string(&p).with_context(|| format!("read {} failed", p))?),
        None => None,
    };

    let config_dir = parse_arg_value(&args, "--config-dir")
        .map(PathBuf::from)
        .or_else(ConfigStore::default_config_dir)
        .context("no config directory available")?;
    let mut config = ConfigStore::new(config_dir)
        .load_effective()
        .map_err(anyhow::Error::msg)?;
    if let Some(url) = parse_arg_value(&args, "--detector-url") {
        config.detector.base_url = url.clone();
        config.detector.sentence_base_url = url;
    }
    if has_flag(&args, "--degraded") {
        config.detection.document_fallback = DocumentFallback::Degraded;
    }

    let metrics = compute_text_metrics(&text);
    eprintln!("File: {}", path);
    eprintln!("Words: {}  Sentences: {}", metrics.word_count, metrics.sentence_count);
    eprintln!("Detector: {}", config.detector.base_url);

    let output = if has_flag(&args, "--segments-only") {
        let sentences = segment(&text);
        for s in sentences.iter().take(20) {
            eprintln!("  [{}] ({}w) {}", s.index, s.word_count, preview(&s.text, 80));
        }
        serde_json::to_value(&sentences)?
    } else {
        let api = DraftCheckApi::from_config(&config, Arc::new(InMemoryStore::new()))
            .map_err(|e| anyhow::anyhow!(e.to_response().message))?;

        if has_flag(&args, "--sentences") {
            let resp = api
                .detect_sentences(SentenceDetectRequest { text })
                .await
                .map_err(|e| anyhow::anyhow!(e.to_response().message))?;
            serde_json::to_value(&resp)?
        } else {
            let result = api
                .detect_ai(DocumentDetectRequest {
                    text,
                    previous_text,
                })
                .await;
            match result {
                Ok(r) => serde_json::to_value(&r)?,
                Err(e) => {
                    let body = e.to_response();
                    println!("{}", serde_json::to_string_pretty(&json!({ "status": e.status_code(), "body": body }))?);
                    bail!("{}", e);
                }
            }
        }
    };

    let rendered = serde_json::to_string_pretty(&output)?;
    match parse_arg_value(&args, "--out") {
        Some(out) => {
            std::fs::write(&out, &rendered).with_context(|| format!("write {} failed", out))?;
            eprintln!("Wrote {}", out);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
