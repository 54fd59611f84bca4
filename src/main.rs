use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use featuregen_core::{FeaturegenConfig, Secrets, LLM_API_KEY_VAR, VCS_TOKEN_VARS};
use featuregen_generate::{Pipeline, RunOptions};
use miette::{IntoDiagnostic, Result};

const CONFIG_FILE: &str = ".featuregen.toml";

#[derive(Parser)]
#[command(
    name = "featuregen",
    version,
    about = "Generate Karate tests for REST controllers with an LLM",
    long_about = "featuregen clones a repository, asks an LLM to write a Karate feature file\n\
                   for every REST controller it finds, and pushes the result on a new branch.\n\n\
                   Examples:\n  \
                     featuregen run                          Generate and push with .featuregen.toml\n  \
                     featuregen run --no-push                Generate into the working copy only\n  \
                     featuregen run --repo-url <url> --branch generated-tests\n  \
                     featuregen doctor                       Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .featuregen.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Clone, generate feature files, and publish them on a branch
    #[command(long_about = "Clone, generate feature files, and publish them on a branch.\n\n\
        Deletes and re-clones the working copy, finds every file ending in the\n\
        controller suffix, sends each one to the LLM, writes the returned Karate\n\
        script next to the other test resources, then commits everything on a new\n\
        branch and pushes it.\n\n\
        Requires OPENAI_API_KEY, and GITHUB_TOKEN unless --no-push is given.\n\n\
        Examples:\n  featuregen run\n  featuregen run --no-push --workdir /tmp/checkout")]
    Run {
        /// Repository to clone (overrides [repository].remote_url)
        #[arg(long, env = "FEATUREGEN_REPO_URL")]
        repo_url: Option<String>,
        /// Local working copy (overrides [repository].workdir)
        #[arg(long, env = "FEATUREGEN_WORKDIR")]
        workdir: Option<PathBuf>,
        /// Branch to create and push (overrides [publish].branch)
        #[arg(long, env = "FEATUREGEN_BRANCH")]
        branch: Option<String>,
        /// Model identifier (overrides [llm].model)
        #[arg(long, env = "FEATUREGEN_MODEL")]
        model: Option<String>,
        /// Write feature files but skip branch, commit, and push
        #[arg(long)]
        no_push: bool,
    },
    /// Create a default .featuregen.toml configuration file
    #[command(long_about = "Create a default .featuregen.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .featuregen.toml already exists.")]
    Init,
    /// Check your featuregen setup and environment
    #[command(long_about = "Check your featuregen setup and environment.\n\n\
        Reports the config file, API key, GitHub token, and working copy state.\n\
        Does not contact the network. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Machine-readable JSON with camelCase keys
    Json,
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mfeaturegen\x1b[0m v{version} — Karate tests for your REST controllers\n");
        println!("Quick start:");
        println!("  \x1b[36mfeaturegen init\x1b[0m             Create a .featuregen.toml config file");
        println!("  \x1b[36mfeaturegen doctor\x1b[0m           Check API key and GitHub token");
        println!("  \x1b[36mfeaturegen run --no-push\x1b[0m    Generate feature files locally");
        println!("  \x1b[36mfeaturegen run\x1b[0m              Generate and push a branch\n");
    } else {
        println!("featuregen v{version} — Karate tests for your REST controllers\n");
        println!("Quick start:");
        println!("  featuregen init             Create a .featuregen.toml config file");
        println!("  featuregen doctor           Check API key and GitHub token");
        println!("  featuregen run --no-push    Generate feature files locally");
        println!("  featuregen run              Generate and push a branch\n");
    }

    println!("Run 'featuregen <command> --help' for details.");
}

fn load_config(path: Option<&Path>) -> Result<FeaturegenConfig> {
    let config = match path {
        Some(path) => FeaturegenConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                FeaturegenConfig::from_file(default_path)?
            } else {
                FeaturegenConfig::default()
            }
        }
    };
    Ok(config)
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self, use_color: bool) -> String {
        match (self.status, use_color) {
            ("pass", true) => "\x1b[32m\u{2713}\x1b[0m".into(),
            ("fail", true) => "\x1b[31m\u{2717}\x1b[0m".into(),
            (_, true) => "\x1b[33m~\x1b[0m".into(),
            ("pass", false) => "\u{2713}".into(),
            ("fail", false) => "\u{2717}".into(),
            _ => "~".into(),
        }
    }
}

fn run_doctor(
    config: &FeaturegenConfig,
    config_path: &Path,
    secrets: &Secrets,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{} not found, using defaults", config_path.display()),
        ));
    }

    match config.validate() {
        Ok(()) => checks.push(CheckResult::pass("config_values", "valid")),
        Err(e) => checks.push(CheckResult::fail(
            "config_values",
            e.to_string(),
            format!("fix the value in {}", config_path.display()),
        )),
    }

    checks.push(CheckResult::info(
        "repository",
        format!(
            "{} -> {}",
            config.repository.remote_url,
            config.repository.workdir.display()
        ),
    ));

    checks.push(CheckResult::pass(
        "llm_provider",
        format!("{} (model: {})", config.llm.provider, config.llm.model),
    ));
    if secrets.has_llm_api_key() {
        checks.push(CheckResult::pass("llm_api_key", format!("{LLM_API_KEY_VAR} set")));
    } else {
        checks.push(CheckResult::fail(
            "llm_api_key",
            format!("{LLM_API_KEY_VAR} not set"),
            format!("export {LLM_API_KEY_VAR}=... or set api_key in [llm]"),
        ));
    }

    if secrets.has_vcs_token() {
        checks.push(CheckResult::pass("github_token", format!("{} set", VCS_TOKEN_VARS[0])));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            format!("{} not set", VCS_TOKEN_VARS[0]),
            format!("export {}=... (not needed with --no-push)", VCS_TOKEN_VARS[0]),
        ));
    }

    let workdir = &config.repository.workdir;
    if workdir.exists() {
        checks.push(CheckResult::info(
            "working_copy",
            format!("{} exists and will be replaced on the next run", workdir.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "working_copy",
            format!("{} will be created on the next run", workdir.display()),
        ));
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let version = env!("CARGO_PKG_VERSION");
            println!("featuregen v{version} — Environment Check\n");

            for check in &checks {
                let label = check.name.replace('_', " ");
                println!("  {} {label:<16} {}", check.symbol(use_color), check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# featuregen configuration

[repository]
# remote_url = "https://github.com/saivijaykumar/BankManagement.git"
# workdir = "temp-repo"

[locator]
# suffix = "Controller.java"

[llm]
# OpenAI-compatible endpoint; the key is read from OPENAI_API_KEY
# base_url = "https://api.openai.com"
# model = "gpt-4"
# temperature = 0.3
# timeout_secs = 120
# max_retries = 0

[output]
# dir = "src/test/resources/karate"
# extension = "feature"

[publish]
# The token is read from GITHUB_TOKEN (or GH_TOKEN)
# branch = "karate-tests-poc"
# commit_message = "Add generated Karate tests"
# remote = "origin"
# username = "x-access-token"
# author_name = "featuregen"
# author_email = "featuregen@localhost"
"#;

fn spinner() -> Result<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return Ok(indicatif::ProgressBar::hidden());
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .into_diagnostic()?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Run {
            repo_url,
            workdir,
            branch,
            model,
            no_push,
        }) => {
            if let Some(url) = repo_url {
                config.repository.remote_url = url;
            }
            if let Some(dir) = workdir {
                config.repository.workdir = dir;
            }
            if let Some(branch) = branch {
                config.publish.branch = branch;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }

            if cli.verbose {
                eprintln!("repository: {}", config.repository.remote_url);
                eprintln!("working copy: {}", config.repository.workdir.display());
                eprintln!("suffix: {}", config.locator.suffix);
                eprintln!(
                    "model: {} (temperature {}) at {}",
                    config.llm.model, config.llm.temperature, config.llm.base_url
                );
                eprintln!("output: {}", config.output_dir().display());
                if no_push {
                    eprintln!("publish: disabled");
                } else {
                    eprintln!(
                        "publish: {} -> {}",
                        config.publish.branch, config.publish.remote
                    );
                }
            }

            let secrets = Secrets::from_env(&config.llm);
            let options = RunOptions {
                publish: !no_push,
                verbose: cli.verbose,
            };
            let progress = spinner()?;
            let pipeline = Pipeline::new(config, &secrets, options)?.with_progress(progress.clone());

            let result = pipeline.run().await;
            progress.finish_and_clear();
            let report = result?;

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
                }
                OutputFormat::Text => print!("{report}"),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            let secrets = Secrets::from_env(&config.llm);
            run_doctor(&config, &config_path, &secrets, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "featuregen", &mut std::io::stdout());
        }
    }

    Ok(())
}
