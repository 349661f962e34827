//! Command-line front end over a directory of stored compositions.
//!
//! The store location comes from `--store`, then the config file, then the
//! default data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use composer_config::Config;
use composer_engine::render::{RenderContext, render_composition};
use composer_engine::{
    BlockBody, CompositionId, CompositionKind, ContentBlock, Editor, EditorSettings, FileStore,
    FrontmatterDetector, PersistenceClient, SourceCopy,
};

#[derive(Parser, Debug)]
#[command(name = "composer")]
#[command(about = "Assemble email and news compositions from blocks")]
struct Args {
    /// Composition store directory, overriding the config file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a composition from copy files
    Import {
        /// Composition name
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "email")]
        kind: CompositionKind,

        /// Convert text blocks that look like frontmatter before saving
        #[arg(long)]
        convert_frontmatter: bool,

        /// Plain text copy, one file per source
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List stored compositions
    List,
    /// Print the block outline of a composition
    Show { id: String },
    /// Render a composition to HTML on stdout
    Render {
        id: String,

        /// Stylesheet to include in the document head
        #[arg(long)]
        css: Option<PathBuf>,
    },
    /// Report text blocks that look like frontmatter
    Detect {
        id: String,

        /// Convert the reported blocks and save
        #[arg(long)]
        convert: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let config = match Config::load() {
        Ok(Some(config)) => {
            log::debug!("Loaded config from {}", Config::config_path().display());
            config
        }
        Ok(None) => {
            log::debug!("No config file at {}, using defaults", Config::config_path().display());
            Config::default()
        }
        Err(e) => {
            log::error!("Config::load() failed with error: {e}");
            return Err(e.into());
        }
    };

    let store_path = args.store.clone().unwrap_or_else(|| config.store_path.clone());
    let store = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("opening store at {}", store_path.display()))?,
    );
    log::debug!("Using store at {}", store.root().display());

    let settings = editor_settings(&config);
    let detector = detector(&config)?;

    match args.command {
        Command::Import {
            name,
            kind,
            convert_frontmatter,
            files,
        } => {
            let copies = read_copies(&files)?;
            let mut editor =
                Editor::new(store.clone(), kind, settings).with_detector(detector).with_copy(&copies);
            if convert_frontmatter {
                for id in editor.frontmatter_candidates() {
                    editor.convert_text_to_frontmatter(&id);
                }
            }
            let outcome = editor.save(Some(name.as_str())).await?;
            log::info!("{outcome:?}");
            if let Some(id) = &editor.composition().id {
                println!("{id}");
            }
            editor.close();
        }
        Command::List => {
            for summary in store.list_compositions().await? {
                println!(
                    "{}\t{}\t{} blocks\t{}",
                    summary.id, summary.kind, summary.block_count, summary.name
                );
            }
        }
        Command::Show { id } => {
            let editor = Editor::load(store.clone(), &CompositionId::from(id), settings).await?;
            let composition = editor.close();
            println!("{} ({})", composition.name, composition.kind);
            for block in &composition.blocks {
                println!("{:>3}  {}", block.order, outline(block));
            }
        }
        Command::Render { id, css } => {
            let composition = store.load_composition(&CompositionId::from(id)).await?.hydrate();
            let mut context = RenderContext::for_composition(&composition);
            if let Some(css) = css {
                let stylesheet = std::fs::read_to_string(&css)
                    .with_context(|| format!("reading stylesheet {}", css.display()))?;
                context = context.with_stylesheet(stylesheet);
            }
            let document = render_composition(&composition, &context);
            log::info!("Rendered \"{}\"", document.title);
            print!("{}", document.html);
        }
        Command::Detect { id, convert } => {
            let mut editor = Editor::load(store.clone(), &CompositionId::from(id), settings)
                .await?
                .with_detector(detector);
            let candidates = editor.frontmatter_candidates();
            for block_id in &candidates {
                println!("{block_id}");
            }
            if convert && !candidates.is_empty() {
                for block_id in &candidates {
                    editor.convert_text_to_frontmatter(block_id);
                }
                editor.save(None).await?;
                log::info!("Converted {} blocks", candidates.len());
            }
            editor.close();
        }
    }

    Ok(())
}

fn editor_settings(config: &Config) -> EditorSettings {
    EditorSettings {
        autosave_delay: Duration::from_millis(config.autosave.delay_ms),
        autosave_enabled: config.autosave.enabled,
        min_name_len: config.save.min_name_len,
        frontmatter_min_pairs: config.frontmatter.min_pairs,
        frontmatter_template: config.frontmatter.template.clone(),
    }
}

fn detector(config: &Config) -> Result<FrontmatterDetector> {
    let min_pairs = config.frontmatter.min_pairs;
    match &config.frontmatter.key_pattern {
        Some(pattern) => FrontmatterDetector::with_key_pattern(min_pairs, pattern)
            .with_context(|| format!("invalid frontmatter key pattern {pattern:?}")),
        None => Ok(FrontmatterDetector::new(min_pairs)),
    }
}

fn read_copies(files: &[PathBuf]) -> Result<Vec<SourceCopy>> {
    files
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading copy {}", path.display()))?;
            Ok(SourceCopy::new(copy_id(path), text))
        })
        .collect()
}

fn copy_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One-line description of a block
fn outline(block: &ContentBlock) -> String {
    let summary = match &block.body {
        BlockBody::Text { content, element } | BlockBody::Heading { content, element } => {
            format!("{} {}", element.tag(), preview(content))
        }
        BlockBody::Image { url, alt, .. } => format!("{url} \"{alt}\""),
        BlockBody::Video { url, .. } => url.clone(),
        BlockBody::List { items, ordered } => {
            let style = if *ordered { "ordered" } else { "bulleted" };
            format!("{} {style} items", items.len())
        }
        BlockBody::Html { html } => preview(html),
        BlockBody::Button { label, url } => format!("[{label}] {url}"),
        BlockBody::Frontmatter { fields } => fields
            .iter()
            .map(|field| field.key.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        BlockBody::Divider => String::new(),
    };
    format!("{:<12}{summary}", block.kind().as_str())
}

fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut preview: String = first_line.chars().take(60).collect();
    if preview.len() < text.len() {
        preview.push('…');
    }
    preview
}
