//! docbox-admin: command-line client for the docbox admin API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docbox_admin::api::{auth, root, tenant};
use docbox_admin::types::{CreateTenant, MigrateTenants};
use docbox_admin::{AdminClient, AdminConfig, AdminError, TenantScope};
use serde::Serialize;

/// docbox admin client
#[derive(Parser)]
#[command(name = "docbox-admin")]
#[command(version)]
#[command(about = "Manage docbox tenants and migrations")]
struct Args {
    /// Config file (default: ~/.docbox-admin/config.toml, then /etc/docbox-admin/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin API base URL, overriding the config file
    #[arg(long)]
    base_url: Option<String>,

    /// Admin password. When set, the session is authenticated before running the command.
    #[arg(long, env = "DOCBOX_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Session commands
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Server bootstrap and global migrations
    #[command(subcommand)]
    Root(RootCommand),

    /// Tenant management
    #[command(subcommand)]
    Tenant(TenantCommand),
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Check whether the session is authenticated
    Status,
    /// Authenticate with the admin password
    Login,
    /// End the session
    Logout,
}

#[derive(Subcommand)]
enum RootCommand {
    /// Check whether the server is initialized
    Status,
    /// Initialize the server
    Initialize,
    /// List pending migrations per tenant
    Migrations,
    /// Migrate every tenant
    Migrate {
        /// Continue past tenants that fail to migrate
        #[arg(long)]
        skip_failed: bool,
        /// Only migrate tenants in this environment
        #[arg(long)]
        env: Option<String>,
    },
}

#[derive(Subcommand)]
enum TenantCommand {
    /// List tenants
    List,
    /// Show one tenant
    Get { env: String, id: String },
    /// Create a tenant from a JSON provisioning record
    Create {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Apply pending migrations to one tenant
    Migrate { env: String, id: String },
    /// Delete a tenant
    Delete { env: String, id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = AdminConfig::load(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }
    let client = AdminClient::from_config(&config)?;

    let login_only = matches!(args.command, Command::Auth(AuthCommand::Login));
    if let Some(password) = &args.password {
        if let Err(e) = client.authenticate().execute(password.clone()).await {
            return fail(e);
        }
        if login_only {
            println!("authenticated");
            return Ok(());
        }
    }

    let result = run(&client, args.command).await;
    client.shutdown();
    match result {
        Ok(()) => Ok(()),
        Err(e) => fail(e),
    }
}

async fn run(client: &AdminClient, command: Command) -> docbox_admin::Result<()> {
    let queries = client.queries();
    let http = client.http();

    match command {
        Command::Auth(AuthCommand::Status) => {
            let authenticated = queries.fetch(auth::is_authenticated_query(http)).await?;
            println!("authenticated: {authenticated}");
        }
        Command::Auth(AuthCommand::Login) => {
            return Err(AdminError::InvalidInput(
                "a password is required (--password or DOCBOX_ADMIN_PASSWORD)".to_string(),
            ));
        }
        Command::Auth(AuthCommand::Logout) => {
            client.logout().execute(()).await?;
            println!("logged out");
        }
        Command::Root(RootCommand::Status) => {
            let initialized = queries.fetch(root::is_initialized_query(http)).await?;
            println!("initialized: {initialized}");
        }
        Command::Root(RootCommand::Initialize) => {
            client.initialize().execute(()).await?;
            println!("initialized");
        }
        Command::Root(RootCommand::Migrations) => {
            let pending = queries.fetch(root::migrations_query(http)).await?;
            if pending.iter().all(|t| t.migrations.is_empty()) {
                println!("no pending migrations");
            }
            for entry in pending.iter().filter(|t| !t.migrations.is_empty()) {
                println!("{}/{} ({})", entry.tenant.env, entry.tenant.id, entry.tenant.name);
                for migration in &entry.migrations {
                    println!("  {migration}");
                }
            }
        }
        Command::Root(RootCommand::Migrate { skip_failed, env }) => {
            let request = MigrateTenants {
                env,
                ..MigrateTenants::skip_failed(skip_failed)
            };
            client.migrate_tenants().execute(request).await?;
            println!("migrations applied");
        }
        Command::Tenant(TenantCommand::List) => {
            let tenants = queries.fetch(tenant::tenants_query(http)).await?;
            print_json(tenants.as_ref())?;
        }
        Command::Tenant(TenantCommand::Get { env, id }) => {
            let scope = TenantScope::new(env, id);
            let found = queries.fetch(tenant::tenant_query(http, &scope)).await?;
            print_json(found.as_ref())?;
        }
        Command::Tenant(TenantCommand::Create { file }) => {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                AdminError::InvalidInput(format!("failed to read {}: {e}", file.display()))
            })?;
            let request: CreateTenant = serde_json::from_str(&content)?;
            let scope = request.scope();
            client.create_tenant().execute(request).await?;
            println!("created tenant {scope}");
        }
        Command::Tenant(TenantCommand::Migrate { env, id }) => {
            let scope = TenantScope::new(env, id);
            client.migrate_tenant().execute(scope.clone()).await?;
            println!("migrated tenant {scope}");
        }
        Command::Tenant(TenantCommand::Delete { env, id }) => {
            let scope = TenantScope::new(env, id);
            client.delete_tenant().execute(scope.clone()).await?;
            println!("deleted tenant {scope}");
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> docbox_admin::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(error: AdminError) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("error: {}", error.message());
    std::process::exit(1);
}
