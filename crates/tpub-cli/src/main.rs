//! tpub CLI - publish generated blog drafts to Tistory
//!
//! Usage:
//!   tpub publish <folder> <alias>   Publish a result folder with one identity
//!   tpub retry-images <html>        Regenerate a draft's missing images
//!   tpub hashtags <html>            Add a generated hashtag section to a draft
//!   tpub init                       Write the default .tpub/config.toml

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tpub_browser::{BrowserSession, Publisher};
use tpub_core::{Credential, CredentialRegistry, Draft, PublisherConfig, Visibility};
use tpub_gemini::{add_hashtags, repair_images, GeminiClient};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tpub")]
#[command(author, version, about = "Publish generated blog drafts to Tistory")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a result folder
    Publish {
        /// Folder containing blog_post.html and its images
        folder: PathBuf,

        /// Identity alias (TISTORY_ALIAS_n)
        alias: String,

        /// private or public (overrides the config file)
        #[arg(long)]
        visibility: Option<Visibility>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Directory holding .tpub/config.toml
        #[arg(long, default_value = ".")]
        config_root: PathBuf,
    },

    /// Flatten image paths and regenerate missing images
    RetryImages {
        /// Path to the draft HTML file
        html: PathBuf,
    },

    /// Generate hashtags and insert them into the draft
    Hashtags {
        /// Path to the draft HTML file
        html: PathBuf,
    },

    /// Write the default configuration file
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if dotenv::dotenv().is_err() {
        warn!("No .env file found, using the process environment");
    }

    match cli.command {
        Commands::Publish {
            folder,
            alias,
            visibility,
            headless,
            config_root,
        } => cmd_publish(folder, alias, visibility, headless, config_root).await,
        Commands::RetryImages { html } => cmd_retry_images(html).await,
        Commands::Hashtags { html } => cmd_hashtags(html).await,
        Commands::Init { path } => cmd_init(path),
    }
}

/// Everything a publish run needs before a browser is started
#[derive(Debug)]
struct Prepared {
    draft: Draft,
    credential: Credential,
    config: PublisherConfig,
}

/// Resolve input, identity and configuration without touching a browser
fn prepare(
    folder: &Path,
    alias: &str,
    registry: &CredentialRegistry,
    config_root: &Path,
    headless: bool,
    visibility: Option<Visibility>,
) -> Result<Prepared> {
    let mut config = PublisherConfig::load_or_default(config_root)
        .context("Failed to load .tpub/config.toml")?;
    if headless {
        config.browser.headless = true;
    }
    if let Some(visibility) = visibility {
        config.publish.visibility = visibility;
    }

    let credential = registry
        .get(alias)
        .with_context(|| format!("No usable identity for alias '{}'", alias))?
        .clone();

    let draft = Draft::load(folder)
        .with_context(|| format!("Failed to read draft from {}", folder.display()))?;

    Ok(Prepared {
        draft,
        credential,
        config,
    })
}

async fn cmd_publish(
    folder: PathBuf,
    alias: String,
    visibility: Option<Visibility>,
    headless: bool,
    config_root: PathBuf,
) -> Result<()> {
    let registry = CredentialRegistry::from_env();
    let Prepared {
        draft,
        credential,
        config,
    } = prepare(&folder, &alias, &registry, &config_root, headless, visibility)?;

    info!(
        "Publishing '{}' as {} ({} image(s), {} tag(s))",
        draft.title,
        credential.alias,
        draft.local_images().len(),
        draft.tags.len()
    );

    let browser = BrowserSession::open(&config.browser)
        .await
        .context("Failed to start the browser")?;
    let report = Publisher::new(browser, credential, &config).run(&draft).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(fatal) = &report.fatal {
        bail!("Publishing failed at {}", fatal);
    }
    println!("Post published to {}", config.publish.visibility);
    Ok(())
}

async fn cmd_retry_images(html: PathBuf) -> Result<()> {
    let client = GeminiClient::from_env()?;
    let report = repair_images(&html, &client)
        .await
        .with_context(|| format!("Failed to repair images in {}", html.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    let failed = report.failed();
    if !failed.is_empty() {
        bail!("{} image(s) still missing: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

async fn cmd_hashtags(html: PathBuf) -> Result<()> {
    let client = GeminiClient::from_env()?;
    let hashtags = add_hashtags(&html, &client)
        .await
        .with_context(|| format!("Failed to add hashtags to {}", html.display()))?;

    println!("Generated hashtags: {}", hashtags);
    Ok(())
}

fn cmd_init(path: PathBuf) -> Result<()> {
    let config_path = PublisherConfig::write_default(&path)?;
    println!("Created {}", config_path.display());
    println!("Add TISTORY_ALIAS_1, TISTORY_ID_1, TISTORY_PW_1 and TISTORY_BLOG_NAME_1 to .env");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> CredentialRegistry {
        CredentialRegistry::from_lookup(|key| match key {
            "TISTORY_ALIAS_1" => Some("main".to_string()),
            "TISTORY_ID_1" => Some("id".to_string()),
            "TISTORY_PW_1" => Some("pw".to_string()),
            "TISTORY_BLOG_NAME_1" => Some("myblog".to_string()),
            _ => None,
        })
    }

    #[test]
    fn test_publish_args() {
        let cli = Cli::try_parse_from([
            "tpub",
            "publish",
            "result/2024-01-01",
            "main",
            "--visibility",
            "public",
            "--headless",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Publish {
                folder,
                alias,
                visibility,
                headless,
                ..
            } => {
                assert_eq!(folder, PathBuf::from("result/2024-01-01"));
                assert_eq!(alias, "main");
                assert_eq!(visibility, Some(Visibility::Public));
                assert!(headless);
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_bad_visibility_is_rejected() {
        assert!(Cli::try_parse_from(["tpub", "publish", "f", "main", "--visibility", "secret"]).is_err());
    }

    #[test]
    fn test_prepare_applies_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blog_post.html"), "<h1>제목</h1>").unwrap();

        let prepared = prepare(
            dir.path(),
            "MAIN",
            &registry(),
            dir.path(),
            true,
            Some(Visibility::Public),
        )
        .unwrap();
        assert_eq!(prepared.draft.title, "제목");
        assert_eq!(prepared.credential.blog_name, "myblog");
        assert!(prepared.config.browser.headless);
        assert_eq!(prepared.config.publish.visibility, Visibility::Public);
    }

    #[test]
    fn test_prepare_fails_without_identity() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blog_post.html"), "<h1>제목</h1>").unwrap();

        let err = prepare(dir.path(), "other", &registry(), dir.path(), false, None).unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_prepare_fails_without_draft() {
        let dir = TempDir::new().unwrap();
        assert!(prepare(dir.path(), "main", &registry(), dir.path(), false, None).is_err());
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        cmd_init(dir.path().to_path_buf()).unwrap();
        let config = PublisherConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, PublisherConfig::default());
    }
}
