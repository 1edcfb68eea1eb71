// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use backend::config::Config;
use backend::routes;
use backend::session::registry::SessionRegistry;
use backend::state::AppState;
use backend::store::{PgProgressStore, ProgressStore};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed Achievement Catalog and Sample Quiz Content
    if let Err(e) = seed_achievement_catalog(&pool).await {
        tracing::error!("Failed to seed achievement catalog: {:?}", e);
    }
    if let Err(e) = seed_sample_quiz(&pool).await {
        tracing::error!("Failed to seed sample quiz: {:?}", e);
    }

    // Create AppState
    let store: Arc<dyn ProgressStore> = Arc::new(PgProgressStore::new(pool.clone()));
    let state = AppState {
        store,
        sessions: SessionRegistry::new(),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

/// Inserts the default achievement catalog on first boot. Idempotent: an
/// already-seeded catalog is left untouched.
async fn seed_achievement_catalog(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        return Ok(());
    }

    tracing::info!("Seeding achievement catalog...");

    let defaults = [
        ("First Steps", "You completed your very first lesson!", "silver"),
        ("Getting Into It", "You finished another lesson on your path.", "silver"),
        ("Steady Learner", "Lesson after lesson, you keep showing up.", "gold"),
        ("Halfway Hero", "You are well on your way through the course.", "gold"),
        ("Course Champion", "You made it through a whole course!", "platinum"),
    ];

    for (title, description, tier) in defaults {
        sqlx::query("INSERT INTO achievements (title, description, tier) VALUES ($1, $2, $3)")
            .bind(title)
            .bind(description)
            .bind(tier)
            .execute(pool)
            .await?;
    }

    tracing::info!("Achievement catalog seeded.");
    Ok(())
}

/// Inserts one sample quiz on first boot so a fresh install is usable right
/// away. Idempotent like the catalog seed.
async fn seed_sample_quiz(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        return Ok(());
    }

    tracing::info!("Seeding sample quiz...");

    let quiz_id: i64 =
        sqlx::query_scalar("INSERT INTO quizzes (title) VALUES ($1) RETURNING id")
            .bind("World Capitals Warm-up")
            .fetch_one(pool)
            .await?;

    let questions = [
        ("What is the capital of France?", "Paris", r#"["Berlin","Madrid"]"#, Some("geography")),
        ("What is the capital of Italy?", "Rome", r#"["Athens","Vienna"]"#, Some("geography")),
        ("What is 2 + 2?", "4", r#"["3","5"]"#, Some("numbers")),
        ("What color is the sky on a clear day?", "Blue", r#"["Green","Red"]"#, None),
    ];

    for (position, (prompt, correct_answer, distractors, category)) in questions.iter().enumerate()
    {
        sqlx::query(
            "INSERT INTO quiz_questions
                 (quiz_id, position, prompt, correct_answer, distractors, category)
             VALUES ($1, $2, $3, $4, $5::jsonb, $6)",
        )
        .bind(quiz_id)
        .bind(position as i64)
        .bind(prompt)
        .bind(correct_answer)
        .bind(distractors)
        .bind(category)
        .execute(pool)
        .await?;
    }

    tracing::info!("Sample quiz seeded.");
    Ok(())
}
