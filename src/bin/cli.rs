use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;

use classrota::cli::seeder::{SeedConfig, seed_all};

#[derive(Parser)]
#[command(name = "classrota-cli")]
#[command(about = "classrota CLI - administrative tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the database with demo departments, rooms, teachers, and classes
    Seed {
        /// Number of rooms to create
        #[arg(short = 'r', long, default_value = "12")]
        rooms: usize,

        /// Number of teachers per department
        #[arg(long, default_value = "4")]
        teachers: usize,

        /// Number of classes per department
        #[arg(long, default_value = "6")]
        classes: usize,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            rooms,
            teachers,
            classes,
            yes,
        } => {
            if !yes {
                let proceed = Confirm::new()
                    .with_prompt("Seed demo data into the configured database?")
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !proceed {
                    println!("Aborted.");
                    return;
                }
            }

            let database_url =
                std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");

            let config = SeedConfig {
                rooms,
                teachers_per_department: teachers,
                classes_per_department: classes,
                ..SeedConfig::default()
            };

            match seed_all(&pool, config).await {
                Ok(()) => println!("✅ Seeding complete"),
                Err(e) => {
                    eprintln!("❌ Seeding failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
