//! Admin CLI for the pairing service
//!
//! Manual matching round plus participant moderation. Prints one JSON
//! response per invocation. Authorization is the operator's shell access.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairing_core::common::ParticipantId;
use pairing_core::config::Config;
use pairing_core::domains::matching::actions::list_match_history;
use pairing_core::domains::matching::{RoundRunner, RoundTrigger, TriggerSource};
use pairing_core::domains::participant::actions::{
    ban_participant, list_participants, register_participant, request_new_partner,
    unban_participant, update_profile,
};
use pairing_core::domains::participant::{NewParticipant, ProfileUpdate};
use pairing_core::kernel::ServerDeps;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "admin_cli")]
#[command(about = "Pairing service administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a matching round now
    Match,

    /// List all registered participants
    List,

    /// Exclude a participant from matching
    Ban { id: ParticipantId },

    /// Lift a ban
    Unban { id: ParticipantId },

    /// Make a participant available for the next round
    Free { external_id: String },

    /// Register a participant (no-op if the external id is known)
    Register {
        external_id: String,
        #[arg(long)]
        display_name: String,
        #[arg(long, default_value = "")]
        role_title: String,
        #[arg(long, default_value = "")]
        organization: String,
        #[arg(long)]
        username: Option<String>,
    },

    /// Change profile fields; omitted fields keep their value
    Edit {
        external_id: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        role_title: Option<String>,
        #[arg(long)]
        organization: Option<String>,
    },

    /// Show a participant's match history
    History { id: ParticipantId },
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn output<T: Serialize>(success: bool, message: Option<String>, data: Option<T>) -> Result<()> {
    let resp = Response {
        success,
        message,
        data,
    };
    println!("{}", serde_json::to_string(&resp)?);
    Ok(())
}

#[derive(Serialize)]
struct RoundFailure {
    step: String,
    pairs_applied: usize,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,pairing_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = get_pool(&config).await?;
    let deps = ServerDeps::postgres(pool);

    match cli.command {
        Commands::Match => cmd_match(deps, &config).await,
        Commands::List => {
            let overview = list_participants(&deps).await?;
            output(true, None, Some(overview))
        }
        Commands::Ban { id } => {
            let participant = ban_participant(id, &deps).await?;
            output(true, Some(format!("Participant {} banned", id)), Some(participant))
        }
        Commands::Unban { id } => {
            let participant = unban_participant(id, &deps).await?;
            output(true, Some(format!("Participant {} unbanned", id)), Some(participant))
        }
        Commands::Free { external_id } => {
            let participant = request_new_partner(&external_id, &deps).await?;
            output(
                true,
                Some("Participant will be matched in the next round".to_string()),
                Some(participant),
            )
        }
        Commands::Register {
            external_id,
            display_name,
            role_title,
            organization,
            username,
        } => {
            let participant = register_participant(
                NewParticipant {
                    external_id,
                    username,
                    display_name,
                    role_title,
                    organization,
                },
                &deps,
            )
            .await?;
            output(true, None, Some(participant))
        }
        Commands::Edit {
            external_id,
            display_name,
            role_title,
            organization,
        } => {
            let participant = update_profile(
                &external_id,
                ProfileUpdate {
                    display_name,
                    role_title,
                    organization,
                },
                &deps,
            )
            .await?;
            output(true, Some("Profile updated".to_string()), Some(participant))
        }
        Commands::History { id } => {
            let records = list_match_history(id, &deps).await?;
            output(
                true,
                Some(format!("{} matches", records.len())),
                Some(records),
            )
        }
    }
}

async fn get_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_match(deps: ServerDeps, config: &Config) -> Result<()> {
    let runner = RoundRunner::new(deps, config.matching.clone());

    match runner.trigger(TriggerSource::Manual).await {
        Ok(RoundTrigger::Completed(outcome)) if outcome.is_empty() => output(
            true,
            Some(format!(
                "No pairs formed ({} eligible participants)",
                outcome.eligible_count
            )),
            Some(outcome),
        ),
        Ok(RoundTrigger::Completed(outcome)) => output(
            true,
            Some(format!(
                "Matched {} participants ({} pairs)",
                outcome.matched_participant_count(),
                outcome.pairs.len()
            )),
            Some(outcome),
        ),
        Ok(RoundTrigger::Skipped) => output::<()>(
            false,
            Some("Another matching round is already running (server or another admin)".to_string()),
            None,
        ),
        Err(e) => {
            output(
                false,
                Some(e.to_string()),
                Some(RoundFailure {
                    step: e.step.to_string(),
                    pairs_applied: e.pairs_applied,
                }),
            )?;
            Err(e.into())
        }
    }
}
