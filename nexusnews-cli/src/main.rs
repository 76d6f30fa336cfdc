mod doctor;
mod output;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use nexusnews::ai::types::{ContentType, UserInterest};
use nexusnews::ai::{DEFAULT_MAX_KEY_POINTS, DEFAULT_RECOMMENDATION_LIMIT, DEFAULT_SUMMARY_LENGTH};
use nexusnews::{
    Article, Capability, ConfigManager, CredentialOverrides, EverythingQuery, NetworkMonitor,
    Resource, Services, TopHeadlinesQuery, static_models,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nexusnews", version, about = "News reader with AI analysis")]
struct Cli {
    /// Settings file [default: ~/.nexusnews/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// NewsAPI key (overrides config file and NEWS_API_KEY)
    #[arg(long, global = true)]
    news_key: Option<String>,

    /// OpenRouter key (overrides config file and OPENROUTER_API_KEY)
    #[arg(long, global = true)]
    ai_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Top headlines
    Headlines {
        #[arg(long)]
        country: Option<String>,

        /// business, entertainment, general, health, science, sports, technology
        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        query: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Search all articles
    Search {
        query: String,

        #[arg(long)]
        language: Option<String>,

        /// relevancy, popularity or publishedAt
        #[arg(long)]
        sort_by: Option<String>,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Run one AI capability over some article text
    Analyze(AnalyzeArgs),

    /// Ask the assistant a question
    Chat {
        message: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// List the model catalog and the configured call order
    Models,

    /// Check connectivity and credentials
    Doctor,

    /// Inspect or edit the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the settings file location
    Path,

    /// Print the effective settings (keys masked)
    Show,

    /// Update stored values
    Set {
        #[arg(long)]
        news_key: Option<String>,

        #[arg(long)]
        ai_key: Option<String>,

        #[arg(long)]
        primary_model: Option<String>,

        /// How many alternates a failed call may fall back to
        #[arg(long)]
        fallback_depth: Option<usize>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Article text
    #[arg(long)]
    text: Option<String>,

    /// Read article text from a file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn read(&self) -> anyhow::Result<String> {
        read_input(self.text.as_deref(), self.file.as_ref())?
            .context("either --text or --file is required")
    }
}

#[derive(Args)]
#[group(required = false, multiple = false)]
struct ContextArgs {
    /// Article text the conversation is about
    #[arg(long)]
    context_text: Option<String>,

    #[arg(long)]
    context_file: Option<PathBuf>,
}

fn read_input(text: Option<&str>, file: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    if let Some(text) = text {
        return Ok(Some(text.to_string()));
    }
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read {}", path.display())),
        None => Ok(None),
    }
}

#[derive(Args)]
struct AnalyzeArgs {
    /// summarize, sentiment, translate, key-points, entities, topic, bias,
    /// chat, recommend or generate-content
    capability: Capability,

    #[command(flatten)]
    input: InputArgs,

    #[arg(long)]
    title: Option<String>,

    /// Target language for `translate`
    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SUMMARY_LENGTH)]
    max_length: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_KEY_POINTS)]
    max_points: usize,

    /// headline, social-caption, tags, reading-notes or custom
    #[arg(long, default_value = "headline")]
    content_type: ContentType,

    /// Question for `chat`, instructions for `generate-content --content-type custom`
    #[arg(long)]
    prompt: Option<String>,

    /// Reader interest as `topic` or `topic=score`, repeatable (for `recommend`)
    #[arg(long = "interest")]
    interests: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_RECOMMENDATION_LIMIT)]
    limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexusnews=info,nexusnews_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let manager = cli
        .config
        .clone()
        .map(ConfigManager::new)
        .unwrap_or_else(ConfigManager::default_path);
    let overrides = CredentialOverrides {
        news_api_key: cli.news_key.clone(),
        ai_api_key: cli.ai_key.clone(),
    };

    let ok = match cli.command {
        Commands::Config { action } => run_config(&manager, action)?,
        Commands::Models => {
            let settings = manager.load()?;
            output::print_models(&static_models::free_models(), &settings.models);
            true
        }
        Commands::Doctor => doctor::run_doctor(&manager, &overrides).await?,
        command => {
            let settings = manager.load()?;
            let services = Services::build(&settings, &overrides, NetworkMonitor::default())?;
            run_command(&services, command).await?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_command(services: &Services, command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Headlines {
            country,
            category,
            query,
            page,
            page_size,
        } => {
            let query = TopHeadlinesQuery {
                country,
                category,
                query,
                page,
                page_size,
            };
            Ok(render_stream(services.repository.headlines(query)).await)
        }
        Commands::Search {
            query,
            language,
            sort_by,
            page_size,
        } => {
            let query = EverythingQuery {
                language,
                sort_by,
                page_size,
                ..EverythingQuery::new(query)
            };
            Ok(render_stream(services.repository.search(query)).await)
        }
        Commands::Analyze(args) => analyze(services, args).await,
        Commands::Chat { message, context } => {
            let context = read_input(
                context.context_text.as_deref(),
                context.context_file.as_ref(),
            )?;
            let result = services.ai.chat(&[], &message, context.as_deref()).await;
            Ok(output::render(&Resource::from_result(result), |reply| {
                println!("{}\n", reply.message.content);
                println!("You could also ask:");
                for question in &reply.suggested_questions {
                    println!("  - {}", question);
                }
            }))
        }
        Commands::Models | Commands::Doctor | Commands::Config { .. } => Ok(true),
    }
}

/// Print every state a repository stream emits. True if it did not end in an error.
async fn render_stream(
    stream: impl futures::Stream<Item = Resource<Vec<Article>>>,
) -> bool {
    let mut stream = Box::pin(stream);
    let mut ok = true;
    while let Some(state) = stream.next().await {
        if matches!(state, Resource::Success(_)) {
            println!();
        }
        ok = output::render(&state, |articles| output::print_articles(articles));
    }
    ok
}

async fn analyze(services: &Services, args: AnalyzeArgs) -> anyhow::Result<bool> {
    let text = args.input.read()?;
    let title = args.title.as_deref();
    let ai = &services.ai;

    let result: nexusnews::Result<String> = match args.capability {
        Capability::Summarize => ai.summarize(&text, args.max_length).await,
        Capability::Sentiment => ai.analyze_sentiment(&text).await.map(|s| s.to_string()),
        Capability::Translate => {
            let target = args.to.as_deref().context("translate needs --to <language>")?;
            ai.translate(&text, target).await
        }
        Capability::KeyPoints => ai
            .extract_key_points(&text, args.max_points)
            .await
            .map(|r| output::pretty(&r)),
        Capability::Entities => ai.recognize_entities(&text).await.map(|r| output::pretty(&r)),
        Capability::Topic => ai.classify_topic(&text, title).await.map(|r| output::pretty(&r)),
        Capability::Bias => ai.detect_bias(&text, title).await.map(|r| output::pretty(&r)),
        Capability::Chat => {
            let question = args
                .prompt
                .as_deref()
                .unwrap_or("What are the main takeaways of this article?");
            ai.chat(&[], question, Some(text.as_str()))
                .await
                .map(|r| r.message.content)
        }
        Capability::Recommend => {
            let interests = parse_interests(&args.interests)?;
            let candidates = candidate_articles(services, &text).await;
            ai.generate_recommendations(&interests, &candidates, args.limit)
                .await
                .map(|r| output::pretty(&r))
        }
        Capability::GenerateContent => ai
            .generate_content(&text, args.content_type, args.prompt.as_deref())
            .await
            .map(|r| output::pretty(&r)),
    };

    Ok(output::render(&Resource::from_result(result), |s| {
        println!("{}", s)
    }))
}

/// Recommendation candidates: current headlines matching the text as a search
/// term, falling back to the plain top headlines.
async fn candidate_articles(services: &Services, text: &str) -> Vec<(String, String)> {
    let mut stream = Box::pin(services.repository.search(EverythingQuery::new(text.trim())));
    let mut articles = Vec::new();
    while let Some(state) = stream.next().await {
        if let Resource::Success(found) = state {
            articles = found;
        }
    }
    if articles.is_empty() {
        let mut stream = Box::pin(services.repository.headlines(TopHeadlinesQuery::default()));
        while let Some(state) = stream.next().await {
            if let Resource::Success(found) = state {
                articles = found;
            }
        }
    }
    articles
        .into_iter()
        .map(|a| (a.id, format!("{} ({})", a.title, a.source)))
        .collect()
}

fn parse_interests(raw: &[String]) -> anyhow::Result<Vec<UserInterest>> {
    raw.iter()
        .map(|entry| {
            let (topic, score) = match entry.split_once('=') {
                Some((topic, score)) => (
                    topic,
                    score
                        .trim()
                        .parse::<f32>()
                        .with_context(|| format!("invalid interest score in {:?}", entry))?,
                ),
                None => (entry.as_str(), 1.0),
            };
            Ok(UserInterest {
                topic: topic.trim().to_string(),
                score: score.clamp(0.0, 1.0),
                last_updated: Utc::now(),
            })
        })
        .collect()
}

fn run_config(manager: &ConfigManager, action: ConfigAction) -> anyhow::Result<bool> {
    match action {
        ConfigAction::Path => println!("{}", manager.path().display()),
        ConfigAction::Show => {
            let mut settings = manager.load()?;
            settings.news.api_key = settings.news.api_key.as_deref().map(output::mask);
            settings.ai.api_key = settings.ai.api_key.as_deref().map(output::mask);
            println!("{}", output::pretty(&settings));
        }
        ConfigAction::Set {
            news_key,
            ai_key,
            primary_model,
            fallback_depth,
        } => {
            manager.update(|settings| {
                if let Some(key) = news_key {
                    settings.news.api_key = Some(key);
                }
                if let Some(key) = ai_key {
                    settings.ai.api_key = Some(key);
                }
                if let Some(model) = primary_model {
                    settings.models.primary = model;
                }
                if let Some(depth) = fallback_depth {
                    settings.models.fallback_depth = depth;
                }
            })?;
            println!("✅ Saved {}", manager.path().display());
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interests_parse_with_and_without_score() {
        let parsed =
            parse_interests(&["technology=0.9".into(), "sports".into(), "x=7".into()]).unwrap();
        assert_eq!(parsed[0].topic, "technology");
        assert_eq!(parsed[0].score, 0.9);
        assert_eq!(parsed[1].score, 1.0);
        assert_eq!(parsed[2].score, 1.0);
        assert!(parse_interests(&["bad=high".into()]).is_err());
    }

    #[test]
    fn cli_parses_capability_names() {
        let cli = Cli::try_parse_from([
            "nexusnews",
            "analyze",
            "key-points",
            "--text",
            "Some article",
            "--max-points",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.capability, Capability::KeyPoints);
                assert_eq!(args.max_points, 3);
                assert_eq!(args.input.text.as_deref(), Some("Some article"));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn analyze_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["nexusnews", "analyze", "summarize"]).is_err());
        assert!(
            Cli::try_parse_from([
                "nexusnews", "analyze", "summarize", "--text", "a", "--file", "b"
            ])
            .is_err()
        );
    }
}
