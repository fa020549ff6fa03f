mod client;
mod debounce;
mod prefs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::AsyncBufReadExt;

use client::{ApiClient, CategoryNode, SearchHit, Submission};
use debounce::{Debouncer, SEARCH_DEBOUNCE};
use prefs::{PreferenceStore, Preferences, ViewMode};

#[derive(Parser)]
#[command(name = "fenav-cli", version, about = "Browse and search a fenav instance")]
struct Cli {
    /// Base URL of the fenav server.
    #[arg(long, env = "FENAV_SERVER", default_value = "http://127.0.0.1:3000", global = true)]
    server: String,

    /// Session token for protected endpoints.
    #[arg(long, env = "FENAV_SESSION", global = true)]
    session: Option<String>,

    /// Directory holding the preferences file.
    #[arg(long, env = "FENAV_HOME", global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the category tree.
    Tree,
    /// List resources of a category (default: the saved selection).
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        view: Option<ViewMode>,
    },
    /// Search resources and blog posts.
    Search { query: String },
    /// Interactive search: every stdin line is the current input.
    WatchSearch,
    /// Sign in with the service token and print a session token.
    Login {
        #[arg(long)]
        login: String,
        #[arg(long, env = "FENAV_SERVICE_TOKEN")]
        service_token: String,
    },
    /// Submit a new resource (requires a session).
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Show or update saved preferences.
    Prefs {
        #[arg(long, value_enum)]
        view: Option<ViewMode>,
        #[arg(long)]
        category: Option<String>,
        /// Restore defaults.
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = PreferenceStore::new(&cli.home.clone().unwrap_or_else(PreferenceStore::default_dir));
    let prefs = store.load();
    let api = ApiClient::new(&cli.server)?.with_token(cli.session.clone());

    match cli.command {
        Command::Tree => print_tree(&api.category_tree().await?),
        Command::List { category, view } => {
            let category = category.unwrap_or_else(|| prefs.category.clone());
            let resources = api.resources(&category).await?;
            print_resources(&resources, view.unwrap_or(prefs.view));
        }
        Command::Search { query } => print_hits(&api.search(&query).await?),
        Command::WatchSearch => watch_search(api).await?,
        Command::Login {
            login,
            service_token,
        } => {
            let token = api.login(&login, &service_token).await?;
            println!("{token}");
        }
        Command::Submit {
            name,
            url,
            desc,
            tags,
            categories,
            icon,
        } => {
            let created = api
                .submit(&Submission {
                    name,
                    url,
                    desc,
                    tags,
                    categories,
                    icon,
                })
                .await?;
            println!("Created {}", created["id"].as_str().unwrap_or("?"));
        }
        Command::Prefs {
            view,
            category,
            reset,
        } => {
            let updated = update_prefs(prefs, view, category, reset);
            store.save(&updated)?;
            eprintln!("Saved to {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }

    Ok(())
}

fn update_prefs(
    current: Preferences,
    view: Option<ViewMode>,
    category: Option<String>,
    reset: bool,
) -> Preferences {
    let base = if reset { Preferences::default() } else { current };
    Preferences {
        view: view.unwrap_or(base.view),
        category: category.unwrap_or(base.category),
    }
}

async fn watch_search(api: ApiClient) -> Result<()> {
    let (mut debouncer, mut results) = Debouncer::new(SEARCH_DEBOUNCE, move |query: String| {
        let api = api.clone();
        async move { api.search(&query).await }
    });

    tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let Some(outcome) = results.borrow_and_update().clone() else {
                continue;
            };
            match outcome.result {
                Ok(hits) if outcome.query.is_empty() && hits.is_empty() => {}
                Ok(hits) => {
                    println!("-- #{} {} ({} hits)", outcome.generation, outcome.query, hits.len());
                    print_hits(&hits);
                }
                Err(e) => eprintln!("search '{}' failed: {e}", outcome.query),
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        debouncer.input(&line);
    }

    // Let the last query finish before exiting.
    tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
    Ok(())
}

fn print_tree(tree: &[CategoryNode]) {
    for root in tree {
        println!("{} [{}]", root.name, root.id);
        for child in &root.children {
            println!("  {} [{}] ({} links)", child.name, child.id, child.links.len());
        }
    }
}

/// First string-valued field among `keys`.
fn field<'a>(resource: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|k| resource.get(*k).and_then(Value::as_str))
        .unwrap_or("")
}

fn print_resources(resources: &[Value], view: ViewMode) {
    match view {
        ViewMode::List => {
            for r in resources {
                println!("{}", field(r, &["Name", "name", "Title"]));
                println!("    {}", field(r, &["URL", "Url", "url", "Link"]));
                let desc = field(r, &["Desc", "Description", "desc"]);
                if !desc.is_empty() {
                    println!("    {desc}");
                }
            }
        }
        ViewMode::Grid => {
            let names: Vec<&str> = resources
                .iter()
                .map(|r| field(r, &["Name", "name", "Title"]))
                .collect();
            for row in names.chunks(4) {
                let cells: Vec<String> = row.iter().map(|n| format!("{n:<24}")).collect();
                println!("{}", cells.join(" ").trim_end());
            }
        }
    }
}

fn print_hits(hits: &[SearchHit]) {
    for hit in hits {
        println!("[{}] {}  {}", hit.kind, hit.name, hit.url);
    }
}
