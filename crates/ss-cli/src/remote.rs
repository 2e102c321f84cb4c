//! Commands that talk to the backend.

use ss_background::{Backend, BackgroundConfig, HttpBackend};
use ss_core::focus::{blocked_redirect, normalize_sites};
use ss_core::{FocusState, KeywordSet};

use crate::{runtime, FocusAction};

pub fn fetch_keywords(config: &BackgroundConfig) -> Result<KeywordSet, String> {
    let backend = HttpBackend::new(&config.backend_url);
    let raw = runtime()?
        .block_on(backend.fetch_keywords())
        .map_err(|e| format!("Failed to fetch keywords: {}", e))?;
    Ok(KeywordSet::normalize(raw))
}

pub fn cmd_keywords(config: &BackgroundConfig, json: bool) -> Result<(), String> {
    let keywords = fetch_keywords(config)?;

    if json {
        let out = serde_json::to_string_pretty(keywords.as_slice()).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }

    let matcher = keywords
        .compile()
        .map_err(|e| format!("Failed to compile keywords: {}", e))?;

    println!("Keywords from {}", config.backend_url);
    println!("  Count:    {}", keywords.len());
    for keyword in keywords.iter() {
        println!("    {}", keyword);
    }
    match matcher {
        Some(matcher) => println!("  Pattern:  {}", matcher.pattern()),
        None => println!("  Pattern:  (none, masking disabled)"),
    }
    Ok(())
}

fn print_state(state: &FocusState) {
    println!("Focus mode: {}", if state.active { "active" } else { "inactive" });
    println!("  Duration: {}s", state.duration_seconds);
    if let Some(started_at) = &state.started_at {
        println!("  Started:  {}", started_at);
    }
    if state.blocked_sites.is_empty() {
        println!("  Blocked:  (none)");
    } else {
        println!("  Blocked:  {}", state.blocked_sites.join(", "));
    }
}

pub fn cmd_focus(config: &BackgroundConfig, action: FocusAction) -> Result<(), String> {
    let backend = HttpBackend::new(&config.backend_url);
    let rt = runtime()?;

    let state = match action {
        FocusAction::Start { sites } => {
            let sites = normalize_sites(&sites);
            if sites.is_empty() {
                return Err("No sites to block".to_string());
            }
            rt.block_on(backend.focus_start(&sites))
        }
        FocusAction::Stop => rt.block_on(backend.focus_stop()),
        FocusAction::Status => rt.block_on(backend.focus_status()),
    }
    .map_err(|e| e.to_string())?;

    print_state(&state);
    Ok(())
}

pub fn cmd_check(config: &BackgroundConfig, url: &str) -> Result<(), String> {
    let backend = HttpBackend::new(&config.backend_url);
    let state = runtime()?
        .block_on(backend.focus_status())
        .map_err(|e| e.to_string())?;

    match blocked_redirect(url, &state, &config.blocked_page) {
        Some(target) => println!("BLOCKED {} -> {}", url, target),
        None if state.active => println!("ALLOWED {}", url),
        None => println!("ALLOWED {} (focus mode inactive)", url),
    }
    Ok(())
}
