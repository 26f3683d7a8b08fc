use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use deck_common::{ComposerAction, SlideKind};
use deck_core::persist::{FLAG_PREFILL, FLAG_RESULT_HTML, FLAG_RETURN, FLAG_TARGET_SLIDE};
use deck_core::{deckgen, AgentPipeline, Backend, Config, HttpBackend, PipelineRun};
use tracing_subscriber::EnvFilter;

mod session;

pub use session::{SessionContext, ViewState};

#[derive(Parser)]
#[command(name = "deck")]
#[command(about = "AI-assisted slide deck composer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Backend to use and remember: gpt-4o | claude | deepseek
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a whole presentation from a topic and/or lesson plan
    Generate {
        /// Lesson topic
        topic: Option<String>,
        /// Read lesson plan content from a file
        #[arg(short, long)]
        content_file: Option<PathBuf>,
        /// Also write the presentation JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the simulation agent (analyze, confirm, generate, review)
    Simulate {
        /// What to simulate; falls back to a pending slide request
        prompt: Option<String>,
        /// Reference image to attach to the request
        #[arg(long)]
        image: Option<PathBuf>,
        /// Where to write the generated HTML
        #[arg(short, long, default_value = "simulation.html")]
        output: PathBuf,
        /// Accept the plan as-is without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Request a simulation for a slide; the next `simulate` run serves it
    RequestSim {
        /// Index of the slide in the current deck
        slide_index: usize,
    },
    /// Print the current deck, adopting any finished simulation first
    Show {
        /// Also list the elements on every slide
        #[arg(long)]
        full: bool,
    },
    /// Discard the current session
    Reset,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = Config::from_env();
    let mut ctx = SessionContext::open(config);

    if let Some(model) = &cli.model {
        if Backend::parse(model).is_none() {
            bail!("unknown model '{model}' (expected gpt-4o, claude or deepseek)");
        }
        ctx.session.set_model_preference(model)?;
    }

    match cli.command {
        Some(Commands::Generate {
            topic,
            content_file,
            output,
        }) => generate(&mut ctx, topic, content_file, output).await,
        Some(Commands::Simulate {
            prompt,
            image,
            output,
            yes,
        }) => simulate(&mut ctx, prompt, image, &output, yes).await,
        Some(Commands::RequestSim { slide_index }) => request_sim(&mut ctx, slide_index),
        Some(Commands::Show { full }) => show(&mut ctx, full),
        Some(Commands::Reset) => {
            ctx.commit(&ComposerAction::Reset);
            println!("Session cleared.");
            Ok(())
        }
        None => show(&mut ctx, false),
    }
}

async fn generate(
    ctx: &mut SessionContext,
    topic: Option<String>,
    content_file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let content = match &content_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };

    let client = HttpBackend::new(ctx.config.clone());
    let backend = ctx.backend();
    println!("Generating presentation with {backend}...");
    let presentation =
        deckgen::generate_presentation(&client, backend, topic.as_deref(), content.as_deref())
            .await?;

    println!(
        "Generated \"{}\" with {} slides.",
        presentation.title,
        presentation.slides.len()
    );
    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&presentation)?)?;
        println!("Wrote {}", path.display());
    }
    ctx.commit(&ComposerAction::SetPresentation { presentation });
    Ok(())
}

async fn simulate(
    ctx: &mut SessionContext,
    prompt: Option<String>,
    image: Option<PathBuf>,
    output: &Path,
    yes: bool,
) -> Result<()> {
    // A pending slide request hands over its prompt and a return flag.
    let returning = ctx.session.take_flag(FLAG_RETURN).is_some();
    let prefill = ctx.session.take_flag(FLAG_PREFILL);
    let Some(prompt) = prompt.or(prefill) else {
        bail!("no prompt given and no pending slide request");
    };

    let image_url = match &image {
        Some(path) => Some(image_data_url(path)?),
        None => None,
    };

    let backend = ctx.backend();
    let pipeline = AgentPipeline::new(HttpBackend::new(ctx.config.clone()), &ctx.config);

    println!("Analyzing request with {backend}...");
    let run = pipeline
        .submit(backend, &prompt, image_url.as_deref())
        .await?;

    let (plan, answers) = confirm_interactively(&run, yes)?;
    println!("Generating simulation (this can take a while)...");
    let done = pipeline
        .confirm(backend, plan, answers, image_url.as_deref())
        .await?;

    let html = done.result_html.unwrap_or_default();
    std::fs::write(output, &html)?;
    println!("Wrote {}", output.display());
    if done.salvaged {
        println!("Note: the reply was truncated; a partial artifact was recovered.");
    }
    if let Some(fixes) = &done.fixes {
        println!("Review fixes: {fixes}");
    }

    if returning {
        // The target-slide flag stays in place; `show` routes the artifact
        // into that slide.
        ctx.session.put_flag(FLAG_RESULT_HTML, &html)?;
        println!("Run `deck show` to attach the simulation to its slide.");
    }
    Ok(())
}

/// The human-in-the-loop pause: show the plan, let the user edit it and
/// answer any clarifying questions. No network traffic happens here.
fn confirm_interactively(run: &PipelineRun, yes: bool) -> Result<(String, Vec<String>)> {
    println!("\nPlan:\n{}\n", run.plan);

    if yes {
        return Ok((run.plan.clone(), vec![String::new(); run.questions.len()]));
    }

    let edited = read_line("Edit plan (enter to keep): ")?;
    let plan = if edited.trim().is_empty() {
        run.plan.clone()
    } else {
        edited
    };

    let mut answers = Vec::with_capacity(run.questions.len());
    for question in &run.questions {
        println!("{question}");
        answers.push(read_line("> ")?);
    }
    Ok((plan, answers))
}

fn request_sim(ctx: &mut SessionContext, slide_index: usize) -> Result<()> {
    let Some(presentation) = ctx.state().presentation.as_ref() else {
        bail!("no presentation in this session; run `deck generate` first");
    };
    let Some(slide) = presentation.slides.get(slide_index) else {
        bail!(
            "slide index {slide_index} out of range (deck has {} slides)",
            presentation.slides.len()
        );
    };

    let slide_id = slide.id.clone();
    let title = slide.title.clone();
    let prefill = match slide.kind {
        SlideKind::Simulation => title.clone(),
        _ => format!("Simulate {title}"),
    };
    ctx.session.put_flag(FLAG_TARGET_SLIDE, &slide_id)?;
    ctx.session.put_flag(FLAG_RETURN, "true")?;
    ctx.session.put_flag(FLAG_PREFILL, &prefill)?;
    println!("Requested a simulation for slide {slide_index} ({title}).");
    println!("Run `deck simulate` to build it.");
    Ok(())
}

fn show(ctx: &mut SessionContext, full: bool) -> Result<()> {
    ctx.view.sidebar_collapsed = !full;

    if let Some(index) = ctx.adopt_pending_simulation() {
        println!("Attached a generated simulation to slide {index}.");
    }

    let expanded = !ctx.view.sidebar_collapsed;
    let state = ctx.state();
    let Some(presentation) = &state.presentation else {
        println!("No presentation yet. Run `deck generate <topic>`.");
        return Ok(());
    };

    println!("{} ({:?})", presentation.title, state.phase);
    for (i, slide) in presentation.slides.iter().enumerate() {
        let marker = if i == state.active_slide_index { "*" } else { " " };
        let sim = if slide.simulation_html.is_some() { " [sim]" } else { "" };
        println!("{marker} {i:>2}. [{:?}] {}{sim}", slide.kind, slide.title);
        if expanded {
            for element in &slide.elements {
                println!(
                    "       - {:?} @ ({}, {}): {}",
                    element.kind, element.x, element.y, element.content
                );
            }
        }
    }
    Ok(())
}

/// Install the subscriber only after flag parsing; a filter built before
/// `--debug` is seen would be frozen at its environment default.
fn init_logging(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(
            debug,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_writer(std::io::stderr)
        .init();
}

/// `--debug` wins over `RUST_LOG`; otherwise the env var, then "warn".
fn log_filter(debug: bool, env: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    env.unwrap_or_else(|| "warn".to_string())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

/// Inline a local image as a base64 data-URL for the multimodal backends.
fn image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_owned())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}
