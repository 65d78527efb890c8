use clap::{ArgAction, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use errchain::config::AppConfig;
use errchain::error::{
    debug_payload, find_in_chain, new_correlation_id, recovery_info, root_cause, user_message,
    wrap_api_client, wrap_cli, wrap_model_processor, wrap_orchestrator, wrap_with_correlation,
    BoxError, Category, CategoryDetector, ClassifiedError, Details,
};
use errchain::logging::{init_logging, log_failure};

#[derive(Parser, Debug)]
#[command(name = "errchain")]
#[command(version)]
#[command(about = "Classify LLM provider failures and explain how to recover")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colors (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    log_verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a described provider failure and print recovery guidance
    Classify {
        /// Provider name (e.g. openai, gemini)
        #[arg(long)]
        provider: String,

        /// HTTP status code returned by the provider (0 = none)
        #[arg(long, default_value = "0")]
        status: u16,

        /// Error message reported by the client
        #[arg(long, default_value = "request failed")]
        message: String,

        /// Raw response body, appended to the message as details
        #[arg(long, default_value = "")]
        body: String,

        /// Correlation id to thread through the layers (generated when omitted)
        #[arg(long)]
        correlation_id: Option<String>,

        /// Model name recorded by the model-processor layer
        #[arg(long, default_value = "default")]
        model: String,

        /// Workflow stage recorded by the orchestrator layer
        #[arg(long, default_value = "generate")]
        stage: String,

        /// Also print the developer payload
        #[arg(long)]
        verbose: bool,

        /// Print only the developer payload as JSON
        #[arg(long, conflicts_with = "verbose")]
        json: bool,
    },

    /// List every failure category with its retry guidance
    Categories,
}

/// Exit codes
mod exit_codes {
    use std::process::ExitCode;

    /// Invalid configuration
    pub fn config_error() -> ExitCode {
        ExitCode::from(2)
    }
}

struct ClassifyArgs {
    provider: String,
    status: u16,
    message: String,
    body: String,
    correlation_id: Option<String>,
    model: String,
    stage: String,
}

/// Builds the chain a real request would produce on its way out: the
/// api-client classifies the failure and each outer tier adds its context.
fn build_failure(args: ClassifyArgs) -> Option<BoxError> {
    let correlation_id = args
        .correlation_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_correlation_id);
    debug!(correlation_id = %correlation_id, "Building failure chain");

    let transport: BoxError = args.message.into();
    let classified = ClassifiedError::from_api_failure(
        &args.provider,
        transport,
        args.status,
        &args.body,
    );
    let classified =
        wrap_with_correlation(Some(classified), "", "", Category::Unknown, &correlation_id);

    let api = wrap_api_client(
        classified,
        "generate_content",
        &args.provider,
        Details::new(),
        "",
    );
    let model = wrap_model_processor(api, "process", &args.model, Details::new(), "");
    let orchestrator = wrap_orchestrator(model, "run", &args.stage, Details::new(), "");
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = wrap_cli(orchestrator, "execute", "classify", &argv, Details::new(), "");

    cli.map(|err| Box::new(err) as BoxError)
}

fn paint_headline(text: &str, category: Category, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    match category {
        Category::Cancelled => text.blue().bold().to_string(),
        Category::RateLimit | Category::Network | Category::Server => {
            text.yellow().bold().to_string()
        }
        _ => text.red().bold().to_string(),
    }
}

fn paint_label(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

fn run_classify(
    args: ClassifyArgs,
    verbose: bool,
    json: bool,
    use_color: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(err) = build_failure(args) else {
        return Ok(ExitCode::SUCCESS);
    };
    let err: &(dyn std::error::Error + 'static) = err.as_ref();

    log_failure(err);
    let payload = debug_payload(err);

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(ExitCode::SUCCESS);
    }

    let info = recovery_info(err);
    let text = user_message(err);
    let mut lines = text.lines();
    if let Some(headline) = lines.next() {
        println!("{}", paint_headline(headline, info.category, use_color));
    }
    for line in lines {
        println!("{}", line);
    }

    if verbose {
        if let Some(classified) = find_in_chain::<ClassifiedError>(err) {
            println!();
            println!("{}", paint_label("Provider error:", use_color));
            println!("{}", classified.debug_info());
        }
        let root = root_cause(err).to_string();
        if let Some(detection) = CategoryDetector::builtin().classify(&root) {
            println!();
            println!("{}", paint_label("Message pattern:", use_color));
            println!(
                "{} -> {} (matched \"{}\")",
                detection.description, detection.category, detection.matched
            );
        }
        println!();
        println!("{}", paint_label("Debug payload:", use_color));
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_categories(use_color: bool) -> ExitCode {
    for category in Category::ALL {
        let info = recovery_info(&ClassifiedError::new("", "", category));
        let name = format!("{:<20}", category.as_str());
        let name = if use_color {
            name.bold().to_string()
        } else {
            name
        };
        let retry = if info.retry_possible { "retry" } else { "no-retry" };
        println!(
            "{:>2}  {} {:<9} wait={}s",
            category.tag(),
            name,
            retry,
            info.wait.as_secs()
        );
    }
    ExitCode::SUCCESS
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::config_error());
        }
    };

    init_logging(config.logging.to_logging_config(cli.log_verbosity));

    let use_color = config.display.color && !cli.no_color && std::env::var("NO_COLOR").is_err();

    match cli.command {
        Commands::Classify {
            provider,
            status,
            message,
            body,
            correlation_id,
            model,
            stage,
            verbose,
            json,
        } => {
            let args = ClassifyArgs {
                provider,
                status,
                message,
                body,
                correlation_id,
                model,
                stage,
            };
            run_classify(args, verbose || config.display.verbose, json, use_color)
        }
        Commands::Categories => Ok(run_categories(use_color)),
    }
}
