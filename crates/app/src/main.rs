use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use app::cli::{Cli, Commands, ImportArgs, ServeArgs};
use app::{AppState, init_tracing, router};
use certprep_core::model::ExamType;
use services::{AppServices, Clock, FallbackGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = cli.service_settings()?;

    let generator = FallbackGenerator::from_env();
    if !generator.is_configured() {
        warn!("no question provider configured; pools only grow through imports");
    }

    let services = AppServices::new_sqlite(&cli.db, Clock::default(), settings, Arc::new(generator))
        .await
        .with_context(|| format!("opening {}", cli.db))?;

    match cli.command {
        Commands::Serve(args) => serve(&services, args).await,
        Commands::Seed => {
            for exam in services.default_exams() {
                info!(exam_id = %exam.id(), exam_type = %exam.exam_type(), "exam ready");
            }
            Ok(())
        }
        Commands::Import(args) => import(&services, args).await,
    }
}

async fn serve(services: &AppServices, args: ServeArgs) -> anyhow::Result<()> {
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router(AppState::new(services)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");
    Ok(())
}

async fn import(services: &AppServices, args: ImportArgs) -> anyhow::Result<()> {
    let exam_type = ExamType::parse(args.exam_type)?;
    let report = services
        .import()
        .import_file(&exam_type, &args.file)
        .await
        .with_context(|| format!("importing {}", args.file.display()))?;
    info!(
        %exam_type,
        imported = report.imported,
        duplicates = report.duplicates,
        invalid = report.invalid,
        "import finished"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
