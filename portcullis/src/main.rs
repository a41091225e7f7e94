//! portcullis: inspect inputs and exercise the login guard from a terminal.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use portcullis::{PortcullisBuilder, ProtectionConfig, StaticIdentityBackend, threat, validation};
use serde::Serialize;

const DEMO_ADMIN: &str = "admin@example.com";
const DEMO_PASSWORD: &str = "Adm1n!Passphrase";

#[derive(Parser)]
#[command(name = "portcullis")]
#[command(about = "Login guard with input screening, rate limiting and security auditing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a password and list what it is missing
    AssessPassword {
        password: String,
    },

    /// Sanitize an input and report the injection patterns it contains
    CheckInput {
        input: String,
    },

    /// Replay failed logins against a demo account and print the audit trail
    Simulate {
        /// Client identity the attempts come from
        #[arg(long, default_value = "198.51.100.23")]
        client: String,

        /// Number of failed attempts before a final correct one
        #[arg(long, default_value_t = 6)]
        failures: usize,

        /// Read PORTCULLIS_* variables instead of using defaults
        #[arg(long)]
        from_env: bool,
    },
}

#[derive(Serialize)]
struct InputReport {
    sanitized: String,
    threat: bool,
    patterns: Vec<threat::ThreatKind>,
}

#[derive(Serialize)]
struct AttemptOutcome {
    attempt: usize,
    granted: bool,
    reason: Option<&'static str>,
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portcullis=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::AssessPassword { password } => {
            let assessment = validation::validate_password_strength(&password);
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
        Commands::CheckInput { input } => {
            let report = InputReport {
                sanitized: threat::sanitize(&input),
                threat: threat::detect_threat(&input),
                patterns: threat::scan(&input),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Simulate {
            client,
            failures,
            from_env,
        } => {
            let config = if from_env {
                ProtectionConfig::from_env()?
            } else {
                ProtectionConfig::default()
            };
            let backend =
                StaticIdentityBackend::new().with_account(DEMO_ADMIN, DEMO_PASSWORD, &["admin"]);

            let mut gate = PortcullisBuilder::new()
                .with_memory_storage()
                .with_backend(Arc::new(backend))
                .with_config(config)
                .start_sweeper(false)
                .build()
                .await?;

            let mut outcomes = Vec::with_capacity(failures + 1);
            for attempt in 1..=failures + 1 {
                let password = if attempt > failures {
                    DEMO_PASSWORD.to_string()
                } else {
                    format!("Wrong#Guess{attempt}")
                };
                let outcome = match gate.authenticate(&client, DEMO_ADMIN, &password).await {
                    Ok(principal) => AttemptOutcome {
                        attempt,
                        granted: true,
                        reason: None,
                        message: format!("Access granted to {}", principal.email),
                    },
                    Err(e) if e.is_access_error() => AttemptOutcome {
                        attempt,
                        granted: false,
                        reason: e.reason(),
                        message: e.to_string(),
                    },
                    Err(e) => return Err(e.into()),
                };
                outcomes.push(outcome);
            }

            println!("{}", serde_json::to_string_pretty(&outcomes)?);
            println!(
                "{}",
                serde_json::to_string_pretty(&gate.rate_limit_status(&client).await?)?
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&gate.security_metrics().await?)?
            );
            println!("{}", gate.export_events().await?);

            gate.shutdown().await;
        }
    }

    Ok(())
}
