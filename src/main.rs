use anyhow::{Context, Result};
use brief2script::export;
use brief2script::{create_llm, BuildRequest, Config, ScriptBuilder};
use std::fs;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let preview = if let Some(pos) = args.iter().position(|a| a == "--preview") {
        args.remove(pos);
        true
    } else {
        false
    };

    let request_path = args
        .first()
        .context("Usage: brief2script <request.yml> [output.json] [--preview]")?;
    let output_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "script.json".to_string());

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };

    let content = fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request file {}", request_path))?;
    let request: BuildRequest = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse request file {}", request_path))?;

    let llm = create_llm(&config)?;
    let builder = ScriptBuilder::new(config, llm).with_progress(true);
    let script = builder.build(&request).await?;

    if let Some(parent) = Path::new(&output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&script)?;
    fs::write(&output_path, json)
        .with_context(|| format!("Failed to write {}", output_path))?;
    println!(
        "Script with {} sections written to {}",
        script.sections.len(),
        output_path
    );

    if preview {
        println!("\n--- Preview ---");
        println!("{}", export::export_with_speakers(&script));
    }

    Ok(())
}
