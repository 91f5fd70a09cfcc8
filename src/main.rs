use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use pokesmash::{
    catalog,
    client,
    session::RenderStyle,
};
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: pokesmash [--api-url <url>] [--score-url <url>]\n\
         [--profile <name>] [--profile-dir <path>] [--style pixel|hd|showdown]\n\
         \n\
         Flags:\n\
           --api-url <url>     Override the Pokémon catalog API (default {})\n\
           --score-url <url>   Point the client at a running score service\n\
           --profile <name>    Profile to play as (enables remote scoring)\n\
           --profile-dir <path> Override the profile directory (defaults to ~/.pokesmash/profiles)\n\
           --style <style>     Card art style: pixel, hd, or showdown",
        catalog::DEFAULT_API_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut api_url: Option<String> = None;
    let mut score_url: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut profile_dir: Option<String> = None;
    let mut style: Option<RenderStyle> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--api-url requires a URL argument"))?;
                if api_url.is_some() {
                    return Err(eyre!("--api-url may only be specified once"));
                }
                api_url = Some(url);
            }
            "--score-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--score-url requires a URL argument"))?;
                if score_url.is_some() {
                    return Err(eyre!("--score-url may only be specified once"));
                }
                score_url = Some(url);
            }
            "--profile" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--profile requires a profile name"))?;
                if profile.is_some() {
                    return Err(eyre!("--profile may only be specified once"));
                }
                profile = Some(name);
            }
            "--profile-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--profile-dir requires a path argument"))?;
                if profile_dir.is_some() {
                    return Err(eyre!("--profile-dir may only be specified once"));
                }
                profile_dir = Some(dir);
            }
            "--style" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--style requires a style argument"))?;
                if style.is_some() {
                    return Err(eyre!("--style may only be specified once"));
                }
                style = Some(RenderStyle::parse(&raw).ok_or_else(|| {
                    eyre!("Unknown style '{raw}'; expected pixel, hd, or showdown")
                })?);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    Ok(client::AppConfig {
        api_url: api_url.unwrap_or_else(|| catalog::DEFAULT_API_URL.to_string()),
        score_url,
        profile,
        profile_dir,
        style,
    })
}

// The terminal owns stdout, so logs go to a rolling file instead.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".pokesmash").join("logs"),
        Err(_) => PathBuf::from("."),
    };
    std::fs::create_dir_all(&log_dir).wrap_err("failed to create log directory")?;
    let appender = rolling::daily(&log_dir, "pokesmash.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _log_guard = init_logging()?;
    tracing::info!("starting pokesmash client");
    let app_config = parse_cli_args()?;
    client::run_app(app_config).await
}
