///
/// This module implements the CLI interface for docmee: command parsing,
/// token resolution and printing of results.
///
/// All protocol logic (requests, envelopes, streams, errors) lives in the
/// [`docmee-core`] crate. Commands are executed against the
/// [`DocmeeApi`] trait, so [`execute`] can be driven by a mock in tests and
/// by [`DocmeeClient`] in [`run`].
///
/// ## How To Use
/// - For command-line users: use the installed `docmee` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`docmee-core`]: ../../docmee-core/
use crate::load_config::{config_from_env, load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docmee_core::{
    DocmeeApi, DocmeeClient, GenerateOutlineRequest, GeneratePptxRequest, OutlineStream,
    TaskFile, TemplateFilter, TemplateQuery,
};
use futures::StreamExt;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// CLI for docmee: generate presentation outlines and pptx files.
#[derive(Debug, Parser)]
#[clap(
    name = "docmee",
    version,
    about = "Create docmee tasks, stream outlines and generate presentations"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct TokenArgs {
    /// Token to use; when omitted one is created from DOCMEE_API_KEY
    #[clap(long)]
    pub token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Exchange the API key for a token and print it
    Token {
        #[clap(long)]
        uid: Option<String>,
        #[clap(long)]
        limit: Option<u32>,
    },
    /// Print the generation options
    Options {
        #[clap(long)]
        lang: Option<String>,
    },
    /// Create a generation task from text and/or files
    Task {
        #[clap(flatten)]
        auth: TokenArgs,
        #[clap(long = "type")]
        task_type: i32,
        #[clap(long)]
        content: Option<String>,
        /// File to attach; repeat for several files
        #[clap(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Stream the outline of a task, one JSON object per line
    Outline {
        #[clap(flatten)]
        auth: TokenArgs,
        #[clap(long)]
        id: String,
        #[clap(long)]
        length: Option<String>,
        #[clap(long)]
        scene: Option<String>,
        #[clap(long)]
        audience: Option<String>,
        #[clap(long)]
        lang: Option<String>,
        #[clap(long)]
        prompt: Option<String>,
    },
    /// Stream a revised outline, one JSON object per line
    UpdateOutline {
        #[clap(flatten)]
        auth: TokenArgs,
        #[clap(long)]
        id: String,
        /// Markdown file holding the current outline
        #[clap(long)]
        markdown: PathBuf,
        #[clap(long)]
        question: String,
    },
    /// List presentation templates
    Templates {
        #[clap(flatten)]
        auth: TokenArgs,
        #[clap(long, default_value_t = 1)]
        page: u32,
        #[clap(long, default_value_t = 20)]
        size: u32,
        #[clap(long = "type", default_value_t = 1)]
        template_type: i32,
        #[clap(long)]
        category: Option<String>,
        #[clap(long)]
        style: Option<String>,
        #[clap(long)]
        theme_color: Option<String>,
    },
    /// Generate the presentation for a task
    Generate {
        #[clap(flatten)]
        auth: TokenArgs,
        #[clap(long)]
        id: String,
        #[clap(long)]
        template_id: String,
        /// Markdown file overriding the task's outline
        #[clap(long)]
        markdown: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env(),
    };
    let client = DocmeeClient::from_config(&config.client)
        .context("Failed to construct docmee client")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&client, &config, cli.command, &mut out).await
}

/// Runs one command against `api`, writing results to `out`.
pub async fn execute<A, W>(api: &A, config: &CliConfig, command: Commands, out: &mut W) -> Result<()>
where
    A: DocmeeApi + ?Sized,
    W: Write,
{
    match command {
        Commands::Token { uid, limit } => {
            let token = api
                .create_token(
                    config.require_api_key()?,
                    uid.or_else(|| config.token.uid.clone()),
                    limit.or(config.token.limit),
                )
                .await
                .context("Failed to create docmee token")?;
            writeln!(out, "{token}")?;
        }
        Commands::Options { lang } => {
            let options = api
                .get_options(lang)
                .await
                .context("Failed to fetch generation options")?;
            print_json(out, &options)?;
        }
        Commands::Task {
            auth,
            task_type,
            content,
            files,
        } => {
            let token = resolve_token(api, config, auth).await?;
            let mut attachments = Vec::with_capacity(files.len());
            for path in &files {
                let file = TaskFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read task file {}", path.display()))?;
                attachments.push(file);
            }
            let envelope = api
                .create_task(&token, task_type, content, attachments)
                .await
                .context("Failed to create task")?;
            if !envelope.is_success() {
                tracing::warn!(code = envelope.code, message = ?envelope.message, "Task was not accepted");
            }
            print_json(out, &envelope)?;
        }
        Commands::Outline {
            auth,
            id,
            length,
            scene,
            audience,
            lang,
            prompt,
        } => {
            let token = resolve_token(api, config, auth).await?;
            let request = GenerateOutlineRequest {
                id: Some(id),
                length,
                scene,
                audience,
                lang,
                prompt,
            };
            let stream = api
                .generate_outline(&token, &request)
                .await
                .context("Failed to start outline generation")?;
            print_stream(out, stream).await?;
        }
        Commands::UpdateOutline {
            auth,
            id,
            markdown,
            question,
        } => {
            let token = resolve_token(api, config, auth).await?;
            let markdown = read_markdown(&markdown).await?;
            let stream = api
                .update_outline(&token, &id, &markdown, &question)
                .await
                .context("Failed to start outline update")?;
            print_stream(out, stream).await?;
        }
        Commands::Templates {
            auth,
            page,
            size,
            template_type,
            category,
            style,
            theme_color,
        } => {
            let token = resolve_token(api, config, auth).await?;
            let query = TemplateQuery {
                page,
                size,
                filters: TemplateFilter {
                    template_type,
                    category,
                    style,
                    theme_color,
                },
            };
            let templates = api
                .get_template_page(&token, &query)
                .await
                .context("Failed to fetch templates")?;
            print_json(out, &templates)?;
        }
        Commands::Generate {
            auth,
            id,
            template_id,
            markdown,
        } => {
            let token = resolve_token(api, config, auth).await?;
            let markdown = match markdown {
                Some(path) => Some(read_markdown(&path).await?),
                None => None,
            };
            let request = GeneratePptxRequest {
                id: Some(id),
                template_id: Some(template_id),
                markdown,
            };
            let artifact = api
                .generate_artifact(&token, &request)
                .await
                .context("Failed to generate presentation")?;
            print_json(out, &artifact)?;
        }
    }
    Ok(())
}

async fn resolve_token<A>(api: &A, config: &CliConfig, auth: TokenArgs) -> Result<String>
where
    A: DocmeeApi + ?Sized,
{
    if let Some(token) = auth.token {
        return Ok(token);
    }
    tracing::info!("No --token given, creating one from the API key");
    api.create_token(
        config.require_api_key()?,
        config.token.uid.clone(),
        config.token.limit,
    )
    .await
    .context("Failed to create docmee token")
}

async fn read_markdown(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read markdown file {}", path.display()))
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

async fn print_stream<W: Write>(out: &mut W, mut stream: OutlineStream) -> Result<()> {
    let mut count = 0usize;
    while let Some(element) = stream.next().await {
        let element = element.with_context(|| format!("Outline stream failed after {count} elements"))?;
        serde_json::to_writer(&mut *out, &element)?;
        writeln!(out)?;
        out.flush()?;
        count += 1;
    }
    tracing::info!(elements = count, "Outline stream finished");
    Ok(())
}
