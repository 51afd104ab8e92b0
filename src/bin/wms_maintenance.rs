use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use wms_api::{
    config::{self, WarehouseConfig},
    db::{self, DbPool},
    events::{self, EventSender},
    services::reservations::{ReservationReconciler, ReservationStats, SyncReport},
};

#[derive(Parser)]
#[command(
    name = "wms-maintenance",
    about = "Scheduled maintenance jobs for the warehouse database",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Recompute reserved quantities from active order demand
    SyncReservations,
    /// Print reserved stock and active order counts
    ReservationStats,
}

struct MaintenanceContext {
    db: Arc<DbPool>,
    event_sender: EventSender,
    warehouse: Arc<WarehouseConfig>,
}

impl MaintenanceContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        let (event_sender, event_rx) = EventSender::channel(config.event_channel_capacity);
        tokio::spawn(events::process_events(event_rx));

        Ok(Self {
            db: Arc::new(db_pool),
            event_sender,
            warehouse: Arc::new(config.warehouse.clone()),
        })
    }

    fn reconciler(&self) -> ReservationReconciler {
        ReservationReconciler::new(
            self.db.clone(),
            self.event_sender.clone(),
            self.warehouse.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = MaintenanceContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("migrations failed")?;
            println!("Migrations applied");
        }
        Commands::SyncReservations => {
            let report = context
                .reconciler()
                .sync_inventory_reservations()
                .await
                .context("reservation sync failed")?;
            if cli.json {
                print_json(&report)?;
            } else {
                render_sync_report(&report);
            }
        }
        Commands::ReservationStats => {
            let stats = context
                .reconciler()
                .reservation_stats()
                .await
                .context("failed to load reservation stats")?;
            if cli.json {
                print_json(&stats)?;
            } else {
                render_stats(&stats);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_sync_report(report: &SyncReport) {
    println!(
        "Processed {} stock records: {} corrected, {} skipped",
        report.total_processed, report.corrections_applied, report.skipped
    );
    for correction in &report.corrections {
        println!(
            "- {} • product {} • batch {} • reserved {} -> {} ({:+})",
            correction.inventory_id,
            correction.product_id,
            correction.batch.as_deref().unwrap_or("-"),
            correction.old_reserved,
            correction.new_reserved,
            correction.difference
        );
    }
}

fn render_stats(stats: &ReservationStats) {
    println!(
        "Stock records: {} ({} with reservations, {} units reserved)",
        stats.inventory.total_records,
        stats.inventory.records_with_reservation,
        stats.inventory.total_reserved_units
    );
    println!("Active orders: {}", stats.orders.total);
    for (status, count) in &stats.orders.by_status {
        println!("- {}: {}", status, count);
    }
}
