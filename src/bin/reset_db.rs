use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atlas::config::Config;
use atlas::reset::{reset_database, CannotOpen};
use atlas::seed::{DEMO_PASSWORD, DEMO_USERS};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlas=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rule = "=".repeat(60);
    println!("{rule}");
    println!("  Atlas - full database reset");
    println!("{rule}");
    println!("\nDatabase: {}", config.database_url);

    match reset_database(&config.database_url).await {
        Ok(summary) => {
            println!("  ✓ {} tables created", summary.tables);
            println!("  ✓ demo tenant created");
            println!("  ✓ {} demo users created", summary.seed.users);
            println!("  ✓ {} muscle groups created", summary.seed.muscle_groups);
            println!("  ✓ {} mesocycles created", summary.seed.mesocycles);
            println!(
                "  ✓ {} notification templates created",
                summary.seed.notification_templates
            );

            println!("\n{rule}");
            println!("  Reset completed successfully");
            println!("{rule}");
            println!("\n  Demo accounts (password: {DEMO_PASSWORD}):");
            for (email, role, _, _) in DEMO_USERS {
                println!("    {:<14} {}", role.as_str(), email);
            }
            println!();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nERROR: {e:#}");
            if e.downcast_ref::<CannotOpen>().is_some() {
                eprintln!(
                    "   The database could not be opened. Check that DATABASE_URL points to a writable location."
                );
            }
            ExitCode::FAILURE
        }
    }
}
