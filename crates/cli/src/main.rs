mod config;
mod error;
mod timeline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use auth::{IdentityToken, KeyList};
use calc::ParameterSet;
use clap::{Parser, Subcommand, ValueEnum};
use mcp::Server;
use runtime::{
    AssetLoader, CalculatorService, EmbeddedAssets, FsAssetLoader, GatewayCaller, HostBridge,
    HostContext, InvocationGateway, Theme, ToolDirectory, Viewport, Widget,
};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};
use timeline::{TimelineSurface, stamp};

const CONFIG_FILE: &str = "roiwidget.toml";
const TOKEN_ENV: &str = "ROIWIDGET_TOKEN";
const SIMULATION_KEY: &str = "simulation";

#[derive(Parser)]
#[command(name = "roiwidget")]
#[command(about = "Marketing ROI calculator served as an MCP tool with an interactive widget", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio
    Serve,
    /// Run one calculation through the gateway and print the result
    Compute {
        #[arg(long, default_value = "10000")]
        monthly_budget: f64,
        #[arg(long, default_value = "2.5")]
        cpc: f64,
        /// Conversion rate in percent
        #[arg(long, default_value = "5")]
        conversion_rate: f64,
        /// Average order value
        #[arg(long, default_value = "100")]
        aov: f64,
        /// Identity token (defaults to $ROIWIDGET_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Print a readable summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Drive an in-process host and widget and print the timeline
    Simulate {
        /// Number of rapid budget edits
        #[arg(long, default_value = "3")]
        edits: u32,
        /// Theme to switch to after the edits settle
        #[arg(long, value_enum, default_value = "dark")]
        theme: ThemeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(&config).await,
        Some(Commands::Compute {
            monthly_budget,
            cpc,
            conversion_rate,
            aov,
            token,
            summary,
        }) => {
            let params = ParameterSet::new(monthly_budget, cpc, conversion_rate, aov);
            cmd_compute(&config, params, token, summary)
        }
        Some(Commands::Simulate { edits, theme }) => cmd_simulate(&config, edits, theme.into()).await,
    }
}

/// Logs go to stderr; stdout carries JSON-RPC in serve mode.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_serve(config: &Config) -> Result<()> {
    let keys = config.key_list();
    if keys.is_empty() {
        return Err(Error::NoKeys);
    }

    match &config.widget.assets_dir {
        Some(dir) => serve_with(config, keys, FsAssetLoader::new(dir.clone())).await,
        None => serve_with(config, keys, EmbeddedAssets).await,
    }
}

async fn serve_with<L: AssetLoader>(config: &Config, keys: KeyList, assets: L) -> Result<()> {
    let gateway = Arc::new(InvocationGateway::new(keys));
    let directory = ToolDirectory::builtin()?;
    let service = CalculatorService::new(config.server.name.clone(), gateway, directory, assets);

    info!(name = %config.server.name, "serving MCP on stdio");
    Server::new(service).serve_stdio().await?;
    info!("client disconnected");
    Ok(())
}

fn cmd_compute(
    config: &Config,
    params: ParameterSet,
    token: Option<String>,
    summary: bool,
) -> Result<()> {
    let gateway = InvocationGateway::new(config.key_list());
    let token = token
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .and_then(|t| IdentityToken::from_header(&t));

    let response = gateway.invoke_params(token.as_ref(), &params)?;
    if summary {
        println!("{}", calc::summary(response.record()));
    } else {
        println!("{}", response.text());
    }
    Ok(())
}

/// Plays the host's part against a live widget: initial delivery, a burst
/// of edits, a theme switch, a resize and teardown.
async fn cmd_simulate(config: &Config, edits: u32, theme: Theme) -> Result<()> {
    let token = IdentityToken::new(format!("{SIMULATION_KEY}-{}", std::process::id()));
    let keys = config.key_list().with_key(SIMULATION_KEY, token.as_str());
    let gateway = Arc::new(InvocationGateway::new(keys));

    let initial = gateway.invoke(Some(&token), None)?.into_call_tool_result();
    let caller = GatewayCaller::new(Arc::clone(&gateway), Some(token));
    let debounce = config.widget_config().debounce;
    let (port, handle, task) = Widget::spawn(config.widget_config(), caller, TimelineSurface::new());
    let mut bridge = HostBridge::new(port, config.teardown_grace());

    stamp("host: delivering initial result");
    bridge.deliver_initial(Some(initial))?;

    let mut params = ParameterSet::default();
    for i in 1..=edits {
        params = params.with_budget(params.monthly_budget + 2_500.0);
        stamp(format_args!("user: edit {i} budget -> {:.2}", params.monthly_budget));
        handle.edit(params)?;
        tokio::time::sleep(debounce / 4).await;
    }
    tokio::time::sleep(debounce + Duration::from_millis(50)).await;

    stamp(format_args!("host: theme -> {theme:?}"));
    bridge.change_context(HostContext::with_theme(theme))?;
    stamp("host: viewport -> 640x360");
    bridge.change_context(HostContext {
        theme,
        viewport: Some(Viewport {
            width: 640.0,
            height: 360.0,
        }),
    })?;

    let snapshot = handle.snapshot().await?;
    stamp(format_args!(
        "widget: state {}, issued {} applied {}",
        snapshot.state.name(),
        snapshot.issued_seq,
        snapshot.applied_seq
    ));

    stamp("host: teardown");
    bridge.teardown().await?;
    let surface = task.await?;
    let charts = surface.charts();
    stamp(format_args!(
        "done: {} charts created, {} released, {} live",
        charts.charts_created(),
        charts.charts_released(),
        charts.live_charts()
    ));
    Ok(())
}
