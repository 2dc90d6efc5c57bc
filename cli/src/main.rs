mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_bind_copy, cmd_bind_list, cmd_bind_remove, cmd_bind_set, cmd_rotation_activate,
    cmd_rotation_create, cmd_rotation_delete, cmd_rotation_list, cmd_rotation_preset,
    cmd_rotation_presets, cmd_rotation_show, cmd_settings_mode, cmd_settings_pin,
    cmd_settings_set, cmd_settings_show, cmd_template_add, cmd_template_delete,
    cmd_template_list, cmd_today,
};
use crate::config::Config;
use cadence_core::models::SettingsUpdate;
use cadence_core::service::CoachService;

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Plan meals and training around a repeating workout rotation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the meal and training timeline for a day (defaults to today)
    Today {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage training rotations
    Rotation {
        #[command(subcommand)]
        command: RotationCommands,
    },
    /// Wake/sleep/training anchors and meal slots
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Manage meal and workout templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Bind templates to slots of a rotation day
    Bind {
        #[command(subcommand)]
        command: BindCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RotationCommands {
    /// List the built-in rotation presets
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a rotation from a preset and make it active
    Preset {
        /// Preset key (see `cadence rotation presets`)
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a custom rotation (1-10 days) and make it active
    Create {
        /// Split label per day, in order ("rest" marks a rest day)
        #[arg(required = true, num_args = 1..)]
        labels: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all rotations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active rotation
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a rotation the active one
    Activate {
        /// Rotation ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a rotation and its bindings
    Delete {
        /// Rotation ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show anchors and the slot timeline
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change anchors or meal count; the timeline is recomputed, pinned times kept
    Set {
        /// Meals per day (2-8)
        #[arg(long)]
        meals: Option<i64>,
        /// Wake time (HH:MM)
        #[arg(long)]
        wake: Option<String>,
        /// Sleep time (HH:MM)
        #[arg(long)]
        sleep: Option<String>,
        /// Training start (HH:MM)
        #[arg(long, conflicts_with = "no_training")]
        training: Option<String>,
        /// Meal slot the training follows (0 = before the first meal)
        #[arg(long, conflicts_with = "no_training")]
        after_slot: Option<i64>,
        /// Training duration in minutes
        #[arg(long)]
        duration: Option<i64>,
        /// Remove the training anchor
        #[arg(long)]
        no_training: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pin a slot to a fixed clock time
    Pin {
        /// Meal slot number
        slot: i64,
        /// Time (HH:MM)
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Let a pinned slot follow the computed timeline again
    Unpin {
        /// Meal slot number
        slot: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set how a slot picks its meal: ai_generated, fixed_template, rotation_linked
    Mode {
        /// Meal slot number
        slot: i64,
        /// Slot mode
        mode: String,
        /// Template ID or name (fixed_template only)
        #[arg(long)]
        template: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add a template
    Add {
        /// Kind: meal or workout
        kind: String,
        /// Template name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List templates
    List {
        /// Only this kind: meal or workout
        #[arg(short, long)]
        kind: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a template by ID (bindings to it become unassigned)
    Delete {
        /// Template ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BindCommands {
    /// Bind a template to a slot of a rotation day
    Set {
        /// Rotation day number or ID
        day: String,
        /// Meal slot number, or "workout"
        slot: String,
        /// Template ID or name
        template: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a slot's binding
    Remove {
        /// Rotation day number or ID
        day: String,
        /// Meal slot number, or "workout"
        slot: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a day's bindings
    List {
        /// Rotation day number or ID
        day: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace one day's bindings with another's
    Copy {
        /// Source rotation day number or ID
        from: String,
        /// Target rotation day number or ID
        to: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    logging::init(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let coach = CoachService::new(&config.db_path.to_string_lossy())?;

    match cli.command {
        Commands::Today { date, json } => cmd_today(&coach, date, json),
        Commands::Rotation { command } => match command {
            RotationCommands::Presets { json } => cmd_rotation_presets(json),
            RotationCommands::Preset { key, json } => cmd_rotation_preset(&coach, &key, json),
            RotationCommands::Create { labels, json } => {
                cmd_rotation_create(&coach, &labels, json)
            }
            RotationCommands::List { json } => cmd_rotation_list(&coach, json),
            RotationCommands::Show { json } => cmd_rotation_show(&coach, json),
            RotationCommands::Activate { id, json } => cmd_rotation_activate(&coach, &id, json),
            RotationCommands::Delete { id, json } => cmd_rotation_delete(&coach, &id, json),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&coach, json),
            SettingsCommands::Set {
                meals,
                wake,
                sleep,
                training,
                after_slot,
                duration,
                no_training,
                json,
            } => {
                let update = SettingsUpdate {
                    meals_per_day: meals,
                    wake_time: wake,
                    sleep_time: sleep,
                    training_time: if no_training { Some(None) } else { training.map(Some) },
                    training_after_slot: if no_training {
                        Some(None)
                    } else {
                        after_slot.map(Some)
                    },
                    training_duration: duration,
                };
                cmd_settings_set(&coach, &update, json)
            }
            SettingsCommands::Pin { slot, time, json } => {
                cmd_settings_pin(&coach, slot, Some(&time), json)
            }
            SettingsCommands::Unpin { slot, json } => cmd_settings_pin(&coach, slot, None, json),
            SettingsCommands::Mode {
                slot,
                mode,
                template,
                json,
            } => cmd_settings_mode(&coach, slot, &mode, template.as_deref(), json),
        },
        Commands::Template { command } => match command {
            TemplateCommands::Add { kind, name, json } => {
                cmd_template_add(&coach, &kind, &name, json)
            }
            TemplateCommands::List { kind, json } => {
                cmd_template_list(&coach, kind.as_deref(), json)
            }
            TemplateCommands::Delete { id, json } => cmd_template_delete(&coach, &id, json),
        },
        Commands::Bind { command } => match command {
            BindCommands::Set {
                day,
                slot,
                template,
                json,
            } => cmd_bind_set(&coach, &day, &slot, &template, json),
            BindCommands::Remove { day, slot, json } => cmd_bind_remove(&coach, &day, &slot, json),
            BindCommands::List { day, json } => cmd_bind_list(&coach, &day, json),
            BindCommands::Copy { from, to, json } => cmd_bind_copy(&coach, &from, &to, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(coach, port, &bind, api_key, new_api_key).await
        }
    }
}
