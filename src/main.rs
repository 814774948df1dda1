use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_translate::core::{
    print_error_message, print_info_message, translate_page, translate_selection, TranslateOptions,
};
use page_translate::env::{self, core::LogLevel, core::NoColor, EnvVar};
use page_translate::messaging::controls::SettingsPanel;
use page_translate::translation::config::{load_translation_config, ConfigManager};
use page_translate::translation::storage::{
    install_defaults, JsonFileSettingsStore, SettingsStore,
};
use page_translate::translation::{GoogleTranslateClient, TranslationConfig, TranslationResult};

#[derive(Parser, Debug)]
#[command(
    name = "page-translate",
    version,
    about = "Translate the visible text of HTML pages in place"
)]
struct Cli {
    /// Path to the settings file [default: from config]
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Path to a TOML or JSON configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a local file or remote page
    Translate {
        /// Local path or http(s) URL
        #[arg(value_name = "FILE|URL")]
        input: String,
        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Source language [default: from settings]
        #[arg(short, long)]
        source: Option<String>,
        /// Target language [default: from settings]
        #[arg(short, long)]
        target: Option<String>,
        /// Translate even when disabled or the site is excluded
        #[arg(short, long)]
        force: bool,
        /// Enforce a custom input charset
        #[arg(short, long)]
        encoding: Option<String>,
    },
    /// Translate a piece of selected text
    Selection {
        text: String,
    },
    /// Inspect or change the stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print documentation for supported environment variables and their current values
    EnvDocs,
    /// Write an example configuration file
    ConfigExample {
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Write default settings, keeping the chosen service
    Init,
    /// Turn automatic translation on
    Enable,
    /// Turn automatic translation off
    Disable,
    /// Set the source language
    SetSource { language: String },
    /// Set the target language
    SetTarget { language: String },
    /// Set the translation service
    SetService { service: String },
    /// Exclude the host of a page URL
    Exclude { url: String },
}

fn init_logging(color: bool) {
    let level = LogLevel::get_or_default("info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(format!("page_translate={}", level))
        .unwrap_or_else(|_| "page_translate=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(color),
        )
        .init();
}

fn load_config(cli: &Cli) -> TranslationResult<TranslationConfig> {
    match &cli.config {
        Some(path) => Ok(ConfigManager::from_file(path)?.into_config()),
        None => Ok(load_translation_config()),
    }
}

fn open_settings(cli: &Cli, config: &TranslationConfig) -> Arc<dyn SettingsStore> {
    let path = cli.settings.clone().unwrap_or_else(|| config.settings_path());
    Arc::new(JsonFileSettingsStore::new(path))
}

async fn run(cli: Cli) -> TranslationResult<()> {
    match &cli.command {
        Command::EnvDocs => {
            print_info_message(&env::generate_env_docs());
            match env::EnvConfig::from_env() {
                Ok(current) => print_info_message(&current.summary()),
                Err(e) => tracing::warn!("环境变量无效: {}", e),
            }
            return Ok(());
        }
        Command::ConfigExample { path } => {
            ConfigManager::generate_example_config(path)?;
            print_info_message(&format!("已生成示例配置: {}", path.display()));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    let settings = open_settings(&cli, &config);

    match cli.command {
        Command::Translate {
            input,
            output,
            source,
            target,
            force,
            encoding,
        } => {
            let options = TranslateOptions {
                target: input,
                source_lang: source.or_else(|| env::translation::SourceLang::get_explicit().ok().flatten()),
                target_lang: target.or_else(|| env::translation::TargetLang::get_explicit().ok().flatten()),
                force,
                encoding,
            };

            let report = translate_page(&config, settings, &options).await?;
            tracing::info!(
                "已翻译 {} 个元素，缓存命中率 {:.0}%",
                report.translated_elements,
                report.cache_stats.hit_rate() * 100.0
            );

            match output {
                Some(path) => fs::write(path, &report.output)?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&report.output)?;
                    stdout.flush()?;
                }
            }
        }
        Command::Selection { text } => {
            let translator = Arc::new(GoogleTranslateClient::new(config)?);
            match translate_selection(settings, translator, &text).await {
                Some((original, translation)) => {
                    print_info_message(&format!("原文: {}", original));
                    print_info_message(&format!("译文: {}", translation));
                }
                None => {
                    return Err(page_translate::TranslationError::ServiceUnavailable);
                }
            }
        }
        Command::Settings { action } => {
            let panel = SettingsPanel::new(Arc::clone(&settings), None);
            match action {
                SettingsAction::Show => {
                    let current = panel.load()?;
                    print_info_message(&serde_json::to_string_pretty(&current)?);
                    print_info_message(panel.status()?);
                }
                SettingsAction::Init => {
                    install_defaults(settings.as_ref())?;
                    print_info_message(panel.status()?);
                }
                SettingsAction::Enable => print_info_message(panel.set_enabled(true)?),
                SettingsAction::Disable => print_info_message(panel.set_enabled(false)?),
                SettingsAction::SetSource { language } => panel.set_source_language(&language)?,
                SettingsAction::SetTarget { language } => panel.set_target_language(&language)?,
                SettingsAction::SetService { service } => panel.set_translate_service(&service)?,
                SettingsAction::Exclude { url } => {
                    print_info_message(&panel.exclude_site(&url)?.to_string())
                }
            }
        }
        Command::EnvDocs | Command::ConfigExample { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let color = !NoColor::get_or_default(false);
    init_logging(color);

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error_message(&format!("Error: {}", e), color);
            ExitCode::FAILURE
        }
    }
}
