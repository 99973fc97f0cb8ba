use std::net::SocketAddr;

use migration::MigratorTrait;

use authz_service::config::Config;
use authz_service::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authz_service=debug,tower_http=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // keygen runs before config: it is how the key files get created
    // in the first place.
    if args.len() > 1 && args[1] == "keygen" {
        let private_path = std::env::var("JWT_PRIVATE_KEY_PATH")
            .unwrap_or_else(|_| "keys/private.pem".to_string());
        let public_path = std::env::var("JWT_PUBLIC_KEY_PATH")
            .unwrap_or_else(|_| "keys/public.pem".to_string());

        authz_service::keys::write_rsa_pem_pair(&private_path, &public_path, 2048)?;

        println!("Wrote {private_path} and {public_path}");
        return Ok(());
    }

    // Load config
    let config = Config::from_env().expect("Failed to load configuration");

    // Connect to database
    let db = sea_orm::Database::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Migrations applied");

    // Seed subcommand: cargo run -- seed
    if args.len() > 1 && args[1] == "seed" {
        let client_name = std::env::var("DEFAULT_CLIENT_NAME")
            .unwrap_or_else(|_| "Default Client".to_string());
        let redirect_uri = std::env::var("DEFAULT_CLIENT_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:5173/callback".to_string());

        println!("=== Authorization Service Bootstrap ===\n");

        let result = authz_service::seed::bootstrap(&db, &client_name, &redirect_uri).await?;

        match result.scope_action {
            "created" => println!("Created baseline scope: profile"),
            _ => println!("Baseline scope 'profile' already exists."),
        }
        println!();

        println!("  Client ID: {}", result.client_id);
        if let Some(ref secret) = result.client_secret {
            println!("  Client Secret: {}", secret);
            println!("  (Save this secret - it won't be shown again!)");
        } else {
            println!("  Client '{}' already exists.", client_name);
        }

        println!("\n=== Bootstrap complete ===");
        return Ok(());
    }

    // Initialize token signer and code cipher
    let signer = authz_service::auth::jwt::TokenSigner::new(&config)?;
    let code_cipher = authz_service::auth::crypto::CodeCipher::new(&config.auth_code_secret)?;

    // Build app state
    let state = AppState {
        db,
        signer,
        code_cipher,
        config: config.clone(),
    };

    // Build router
    let app = authz_service::routes::create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .expect("Invalid server address");

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
