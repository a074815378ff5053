use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lumio_core::{ClientConfig, Credentials, Light, RequestError, RetryPolicy};
use tracing::{debug, error};

fn parse_duration(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}

/// Smart light control over an authenticated encrypted session
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Device base URL ending in /app (e.g. http://192.168.1.10/app).
    /// Can also be set via LUMIO_URL.
    #[arg(long, env = "LUMIO_URL")]
    url: Option<String>,

    /// Account username (email) enrolled on the device.
    /// Can also be set via LUMIO_USERNAME.
    #[arg(short, long, env = "LUMIO_USERNAME")]
    username: Option<String>,

    /// Read the password from stdin.
    /// Useful for scripting: echo "password" | lumio -u user@example.com --password-stdin --url ... info
    #[arg(long)]
    password_stdin: bool,

    /// Credentials file used instead of username/password; its raw bytes
    /// are hashed into the long-term credential.
    #[arg(long, env = "LUMIO_CREDS_FILE")]
    creds_file: Option<PathBuf>,

    /// Timeout in seconds per device round-trip
    #[arg(long, value_parser = parse_duration, default_value = "10")]
    timeout: Duration,

    /// Maximum handshake attempts before giving up
    #[arg(long, default_value_t = 4)]
    attempts: u32,

    /// Delay in seconds after the first failed handshake attempt;
    /// later attempts back off exponentially
    #[arg(long, value_parser = parse_duration, default_value = "15")]
    retry_delay: Duration,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the device state
    Info,
    /// Turn the light on
    On,
    /// Turn the light off
    Off,
    /// Flip the power state
    Toggle,
    /// Set brightness percentage (1-100)
    Brightness { level: u8 },
    /// Set color by hue (0-360) and saturation (0-100)
    Color { hue: u16, saturation: u8 },
    /// Set white color temperature in kelvin
    Temp { kelvin: u16 },
    /// Send a raw JSON command
    Raw {
        /// JSON command string
        json: String,
    },
    /// Show version information for CLI and core library
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    if matches!(cli.command, Command::Version) {
        println!("lumio {}", env!("CARGO_PKG_VERSION"));
        println!("lumio-core {}", lumio_core::VERSION);
        return;
    }

    let Some(url) = cli.url.clone() else {
        fail("device URL required: pass --url or set LUMIO_URL");
    };
    let credentials = match resolve_credentials(&cli) {
        Ok(credentials) => credentials,
        Err(message) => fail(&message),
    };

    let config = ClientConfig::new(url, credentials)
        .with_timeout(cli.timeout)
        .with_retry(RetryPolicy::new(cli.attempts, cli.retry_delay));

    debug!(url = %config.base_url, "connecting");
    let mut light = match Light::connect(config).await {
        Ok(light) => light,
        Err(e) => {
            error!("could not establish a session: {}", e);
            fail(&format!("could not establish a session: {}", e));
        }
    };

    if let Err(e) = run_command(&mut light, &cli.command).await {
        error!("command failed: {}", e);
        fail(&format!("command failed: {}", e));
    }
}

async fn run_command(light: &mut Light, command: &Command) -> Result<(), RequestError> {
    match command {
        Command::Info => {
            let info = light.device_info().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&info).unwrap_or_default()
            );
        }
        Command::On => light.set_power(true).await?,
        Command::Off => light.set_power(false).await?,
        Command::Toggle => {
            let on = light.toggle().await?;
            println!("{}", if on { "on" } else { "off" });
        }
        Command::Brightness { level } => light.set_brightness(*level).await?,
        Command::Color { hue, saturation } => light.set_color(*hue, *saturation).await?,
        Command::Temp { kelvin } => light.set_color_temp(*kelvin).await?,
        Command::Raw { json } => {
            let response = light.send_request(json).await?;
            // Validate it's proper JSON before printing
            match serde_json::from_str::<serde_json::Value>(&response) {
                Ok(value) => println!("{}", value),
                Err(_) => println!("{}", response),
            }
        }
        // Handled before connecting
        Command::Version => {}
    }
    Ok(())
}

/// Resolve the long-term credential from CLI options and environment.
///
/// A credentials file wins over username/password. The password comes from
/// LUMIO_PASSWORD, stdin (with --password-stdin), or an interactive prompt.
fn resolve_credentials(cli: &Cli) -> Result<Credentials, String> {
    if let Some(path) = &cli.creds_file {
        let material = std::fs::read(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        return Ok(Credentials::from_material(&material));
    }

    let Some(username) = cli.username.clone() else {
        return Err("no credentials: pass --username or --creds-file".into());
    };

    if let Ok(password) = std::env::var("LUMIO_PASSWORD") {
        return Ok(Credentials::new(username, password));
    }

    let prompt = format!("Password for {}", username);
    let password = read_password(cli.password_stdin, &prompt)?;
    Ok(Credentials::new(username, password))
}

/// Read the password from stdin or an interactive prompt.
fn read_password(password_stdin: bool, prompt: &str) -> Result<String, String> {
    if password_stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| format!("failed to read password from stdin: {}", e))?;
        return Ok(input.trim().to_string());
    }

    if std::io::stdin().is_terminal() {
        eprint!("{}: ", prompt);
        rpassword::read_password().map_err(|e| format!("failed to read password: {}", e))
    } else {
        Err("no password provided; use --password-stdin when piping input".into())
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}
