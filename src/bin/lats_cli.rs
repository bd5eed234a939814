use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use lats_api::{
    auth::{roles, AuthConfig, AuthService},
    config::{self, AppConfig},
    db,
    events::EventSender,
    openapi::ApiDocV1,
    services::payment_monitor::PaymentMonitorService,
};
use serde::Serialize;
use tokio::sync::mpsc;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "lats-cli", about = "Operator tooling for the LATS API", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Mint a bearer token for a staff role
    IssueToken(IssueTokenArgs),
    /// Run the payment anomaly scan once
    ScanPayments(ScanPaymentsArgs),
    /// Print the OpenAPI document
    Openapi,
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long, help = "Staff role: admin, technician, customer-care or cashier")]
    role: String,
    #[arg(long, default_value = "operator", help = "Subject (staff member id) for the token")]
    subject: String,
}

#[derive(Args)]
struct ScanPaymentsArgs {
    #[arg(long, help = "Look-back window in hours; defaults to the configured window")]
    hours: Option<i64>,
}

#[derive(Serialize)]
struct IssuedToken {
    subject: String,
    role: String,
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => handle_migrate().await?,
        Commands::IssueToken(args) => handle_issue_token(args, cli.json)?,
        Commands::ScanPayments(args) => handle_scan_payments(args, cli.json).await?,
        Commands::Openapi => {
            let document = ApiDocV1::openapi()
                .to_pretty_json()
                .context("failed to render OpenAPI document")?;
            println!("{}", document);
        }
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.json_logs());
    Ok(cfg)
}

async fn handle_migrate() -> Result<()> {
    let cfg = load_config()?;
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

fn handle_issue_token(args: IssueTokenArgs, json: bool) -> Result<()> {
    if !roles::ALL.contains(&args.role.as_str()) {
        return Err(anyhow!(
            "unknown role '{}'; expected one of {}",
            args.role,
            roles::ALL.join(", ")
        ));
    }

    let cfg = load_config()?;
    let auth = AuthService::new(AuthConfig::from(&cfg));
    let token = auth
        .issue_role_token(&args.subject, &args.role)
        .map_err(|e| anyhow!("failed to issue token: {}", e))?;

    if json {
        print_json(&IssuedToken {
            subject: args.subject,
            role: args.role,
            token,
        })?;
    } else {
        println!("{}", token);
    }
    Ok(())
}

async fn handle_scan_payments(args: ScanPaymentsArgs, json: bool) -> Result<()> {
    let cfg = load_config()?;
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;

    // Events raised by the scan are only logged from a one-shot CLI run
    let (tx, rx) = mpsc::channel(cfg.event_channel_capacity);
    let events = tokio::spawn(lats_api::events::process_events(rx));

    let monitor = PaymentMonitorService::new(
        Arc::new(pool),
        Arc::new(EventSender::new(tx)),
        cfg.payment_monitor_window_hours,
    );
    let alerts = monitor
        .scan_window(args.hours.unwrap_or(cfg.payment_monitor_window_hours))
        .await
        .context("payment scan failed")?;

    if json {
        print_json(&alerts)?;
    } else if alerts.is_empty() {
        println!("No new alerts");
    } else {
        for alert in &alerts {
            println!(
                "{} {} {} {}",
                alert.id, alert.alert_type, alert.severity, alert.description
            );
        }
    }

    drop(monitor);
    let _ = events.await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
