//! CLI subcommand handlers.

use crate::render;
use crate::{CategoryAction, Commands, ConfigAction, OutputArgs, ProfileAction};
use arxiv_agent_core::config::{AppConfig, workspace_config_path};
use arxiv_agent_core::gateway::{self, AppState};
use arxiv_agent_core::query::{self, ArxivQuery};
use arxiv_agent_core::sort::{SortKey, SortOrder, sort_papers};
use arxiv_agent_core::{
    ArxivClient, CategoryPreferences, FileStorage, PaperRecord, SearchHistoryEntry, SearchMode,
    UserProfile,
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: AppConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => handle_serve(config, host, port).await,
        Commands::Author {
            name,
            max_results,
            output,
        } => {
            let query = query::author_query(&name, max_results)?;
            run_search(&config, query, SearchMode::Author, None, &output).await
        }
        Commands::Daily {
            categories,
            date_range,
            user,
            output,
        } => {
            let categories = match user.as_deref() {
                Some(user_id) => {
                    let storage = FileStorage::from_config(&config.storage)?;
                    let prefs = storage.get_category_preferences(user_id)?;
                    if prefs.hides_all(&categories) {
                        println!("All requested categories are hidden for '{}'.", user_id);
                        return Ok(());
                    }
                    prefs.visible(&categories)
                }
                None => categories,
            };
            let query = query::daily_query(&categories, date_range.as_deref())?;
            run_search(&config, query, SearchMode::Daily, user, &output).await
        }
        Commands::Profile { action } => handle_profile(&config, action),
        Commands::Categories { action } => handle_categories(&config, action),
        Commands::History { limit } => {
            let storage = FileStorage::from_config(&config.storage)?;
            let history = storage.search_history(limit)?;
            if history.is_empty() {
                println!("No searches recorded yet.");
            }
            for entry in &history {
                println!("{}", render::history_line(entry));
            }
            Ok(())
        }
        Commands::Config { action } => handle_config(&config, action, workspace),
    }
}

async fn handle_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = Arc::new(AppState::from_config(&config)?);

    println!("Serving on http://{}", config.server.bind_addr());
    gateway::run(state, &config.server).await?;
    Ok(())
}

fn parse_output_sort(output: &OutputArgs) -> anyhow::Result<Option<(SortKey, SortOrder)>> {
    let Some(raw) = output.sort.as_deref() else {
        return Ok(None);
    };
    let key = SortKey::from_str_loose(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown sort key '{}' (use published, updated or title)", raw))?;
    let order = match output.order.as_deref() {
        Some(o) => SortOrder::from_str_loose(o)
            .ok_or_else(|| anyhow::anyhow!("Unknown sort order '{}' (use asc or desc)", o))?,
        None => SortOrder::default(),
    };
    Ok(Some((key, order)))
}

async fn run_search(
    config: &AppConfig,
    query: ArxivQuery,
    mode: SearchMode,
    user_id: Option<String>,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let sort = parse_output_sort(output)?;
    if output.dry_run {
        println!("{}", query.url(&config.arxiv.base_url));
        return Ok(());
    }

    let client = ArxivClient::new(&config.arxiv, config.retry.clone())?;
    let report = client.fetch_report(&query).await?;
    for diagnostic in &report.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }

    let mut papers: Vec<PaperRecord> = report.papers;
    if let Some((key, order)) = sort {
        sort_papers(&mut papers, key, order);
    }

    let storage = FileStorage::from_config(&config.storage)?;
    let entry = SearchHistoryEntry {
        timestamp: Utc::now(),
        user_id,
        mode,
        query: query.search_query.clone(),
        result_count: papers.len(),
    };
    if let Err(e) = storage.record_search(entry) {
        tracing::warn!(error = %e, "Failed to record search history");
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&papers)?);
    } else if papers.is_empty() {
        println!("No papers found for {}.", query.search_query);
    } else {
        for (i, paper) in papers.iter().enumerate() {
            println!("{}", render::paper_block(i + 1, paper));
        }
        if let Some(total) = report.total_results {
            println!("Showing {} of {} matching papers.", papers.len(), total);
        }
    }
    Ok(())
}

fn handle_profile(config: &AppConfig, action: ProfileAction) -> anyhow::Result<()> {
    let storage = FileStorage::from_config(&config.storage)?;
    match action {
        ProfileAction::Show { user_id } => {
            match storage.get_profile(&user_id)? {
                Some(profile) => println!("{}", render::profile_block(&profile)),
                None => println!("No profile stored for '{}'.", user_id),
            }
            Ok(())
        }
        ProfileAction::Set {
            user_id,
            interests,
            authors,
            saved,
            replace,
        } => {
            let mut profile = if replace {
                UserProfile::new(user_id.as_str())
            } else {
                storage
                    .get_profile(&user_id)?
                    .unwrap_or_else(|| UserProfile::new(user_id.as_str()))
            };
            profile.interests.extend(interests);
            profile.favorite_authors.extend(authors);
            profile.saved_papers.extend(saved);
            let profile = profile.normalized();
            storage.save_profile(&profile)?;
            println!("{}", render::profile_block(&profile));
            Ok(())
        }
        ProfileAction::List => {
            let ids = storage.list_profiles()?;
            if ids.is_empty() {
                println!("No profiles stored.");
            }
            for id in ids {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

fn handle_categories(config: &AppConfig, action: CategoryAction) -> anyhow::Result<()> {
    let storage = FileStorage::from_config(&config.storage)?;
    let (user_id, prefs) = match action {
        CategoryAction::Show { user_id } => {
            let prefs = storage.get_category_preferences(&user_id)?;
            (user_id, prefs)
        }
        CategoryAction::Hide {
            user_id,
            categories,
        } => {
            let mut prefs = storage.get_category_preferences(&user_id)?;
            prefs.hidden.extend(clean_categories(categories));
            storage.save_category_preferences(&user_id, &prefs)?;
            (user_id, prefs)
        }
        CategoryAction::Unhide {
            user_id,
            categories,
        } => {
            let mut prefs = storage.get_category_preferences(&user_id)?;
            for c in clean_categories(categories) {
                prefs.hidden.remove(&c);
            }
            storage.save_category_preferences(&user_id, &prefs)?;
            (user_id, prefs)
        }
    };
    println!("{}", render::hidden_categories_line(&user_id, &prefs));
    Ok(())
}

fn clean_categories(categories: Vec<String>) -> Vec<String> {
    categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn handle_config(config: &AppConfig, action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, AppConfig::default().to_toml_string()?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
