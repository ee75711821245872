use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use euterpe::{
    cli,
    config::{self, Settings},
    error,
    types::{ItemKind, TimeWindow},
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the dashboard server
    Serve,

    /// Connect the owner account used in single-owner mode
    Auth(AuthOptions),

    /// Print the owner's top items as a table
    Top(TopOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Remove the stored owner credential instead
    #[clap(long)]
    pub revoke: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum TopKind {
    Tracks,
    Artists,
    Albums,
}

impl From<TopKind> for ItemKind {
    fn from(kind: TopKind) -> Self {
        match kind {
            TopKind::Tracks => ItemKind::Track,
            TopKind::Artists => ItemKind::Artist,
            TopKind::Albums => ItemKind::Album,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct TopOptions {
    /// What to rank
    #[clap(long, value_enum, default_value = "tracks")]
    pub kind: TopKind,

    /// short_term, medium_term or long_term
    #[clap(long, default_value = "medium_term")]
    pub time_range: TimeWindow,

    /// Number of rows
    #[clap(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "euterpe=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn settings() -> Settings {
    match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("{}", e),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve(settings()).await,
        Command::Auth(opt) if opt.revoke => cli::revoke(&settings()).await,
        Command::Auth(_) => cli::auth(&settings()).await,
        Command::Top(opt) => {
            cli::top(&settings(), opt.kind.into(), opt.time_range, opt.limit).await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
