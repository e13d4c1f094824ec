//! Stockroom CLI - command-line front end for the inventory client.
//!
//! Loads configuration, starts the application context (resuming any stored
//! session), runs one command, and shuts down.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use stockroom_core::models::{ProfileUpdate, RegisterRequest};
use stockroom_core::router::{RouteTarget, ROUTES};
use stockroom_core::{App, Config, Navigation};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: stockroom <command>

Commands:
  login [username]                      Log in (prompts for password)
  logout                                Forget the stored session
  whoami                                Show the current user
  open <path>                           Navigate to a route and print its view
  register <username> <email> [role...] Create an account (prompts for password)
  profile [--email <email>] [--password]
                                        Update your profile
  routes                                List the route table
";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; with `STOCKROOM_LOG_FILE=1` they are also written to a
/// daily file in the cache directory. The returned guard flushes that file.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = std::env::var("STOCKROOM_LOG_FILE")
        .ok()
        .filter(|v| v == "1")
        .and_then(|_| config.cache_dir().ok())
        .map(|dir| {
            let appender = tracing_appender::rolling::daily(dir, "stockroom.log");
            tracing_appender::non_blocking(appender)
        });

    let (file_writer, guard) = match file_layer {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        std::process::exit(2);
    };

    if command == "routes" {
        print_routes();
        return Ok(());
    }

    let mut app = App::start(config)?;
    let result = run(&mut app, command, &args[1..]).await;

    let config = app.shutdown();
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Could not save configuration");
    }
    result
}

async fn run(app: &mut App, command: &str, args: &[String]) -> Result<()> {
    match command {
        "login" => {
            let username = match args.first() {
                Some(name) => name.clone(),
                None => prompt_username(app.config().last_username.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let landing = app.login(&username, &password).await?;
            info!(username = %username, "Login complete");
            println!("Logged in as {}", username);
            match landing {
                Ok(nav) => print_navigation(&nav)?,
                Err(e) => eprintln!("Could not open the start page: {}", e),
            }
        }
        "logout" => {
            app.logout();
            println!("Logged out");
        }
        "whoami" => {
            if !app.store().is_authenticated() {
                bail!("Not logged in");
            }
            let user = app.store().fetch_user().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        "open" => {
            let path = args.first().map(String::as_str).unwrap_or("/");
            let nav = app.navigate(path).await?;
            print_navigation(&nav)?;
        }
        "register" => {
            let (username, email) = match (args.first(), args.get(1)) {
                (Some(u), Some(e)) => (u.clone(), e.clone()),
                _ => bail!("register needs <username> <email>\n\n{}", USAGE),
            };
            let password = rpassword::prompt_password("New user's password: ")?;
            let request = RegisterRequest {
                username,
                email,
                password,
                roles: args[2..].to_vec(),
            };
            let created = app.store().register(&request).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        "profile" => {
            let update = parse_profile_args(args)?;
            if update.is_empty() {
                bail!("Nothing to update\n\n{}", USAGE);
            }
            let user = app.store().update_profile(&update).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
    Ok(())
}

fn parse_profile_args(args: &[String]) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--email" => {
                let email = iter.next().context("--email needs a value")?;
                update.email = Some(email.clone());
            }
            "--password" => {
                update.password = Some(rpassword::prompt_password("New password: ")?);
            }
            other => bail!("Unknown profile option: {}", other),
        }
    }
    Ok(update)
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(name) => print!("Username [{}]: ", name),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), last) {
        (false, _) => Ok(input.to_string()),
        (true, Some(name)) => Ok(name.to_string()),
        (true, None) => bail!("Username is required"),
    }
}

fn print_navigation(nav: &Navigation) -> Result<()> {
    if let Some(ref from) = nav.redirected_from {
        eprintln!("Redirected from {}", from);
    }
    println!("Location: {}", nav.location);
    println!("{}", serde_json::to_string_pretty(&nav.view)?);
    Ok(())
}

fn print_routes() {
    for route in ROUTES {
        let name = route.name.unwrap_or("-");
        match route.target {
            RouteTarget::Redirect(to) => println!("{:<12} {:<10} -> {}", route.path, name, to),
            RouteTarget::View { meta, .. } => println!(
                "{:<12} {:<10} auth={:<5} permission={}",
                route.path,
                name,
                meta.requires_auth,
                meta.permission.unwrap_or("-")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_profile_email() {
        let update = parse_profile_args(&args(&["--email", "new@example.com"])).unwrap();
        assert_eq!(update.email.as_deref(), Some("new@example.com"));
        assert_eq!(update.password, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_profile_no_options_is_empty() {
        assert!(parse_profile_args(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_profile_email_needs_value() {
        let err = parse_profile_args(&args(&["--email"])).unwrap_err();
        assert!(err.to_string().contains("--email needs a value"));
    }

    #[test]
    fn test_profile_unknown_option() {
        let err = parse_profile_args(&args(&["--nickname", "x"])).unwrap_err();
        assert!(err.to_string().contains("Unknown profile option: --nickname"));
    }
}
