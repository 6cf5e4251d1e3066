//! Offline account management against the DocGen database.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use docgen_api::auth::{MIN_PASSWORD_LEN, hash_password};
use docgen_api::config::Config;
use docgen_db::Database;
use docgen_db::models::NewUser;
use docgen_types::models::Role;
use docgen_types::schema::is_email;

#[derive(Parser)]
#[command(name = "docgen-admin")]
#[command(about = "Manage DocGen user accounts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every account
    List,
    /// Create an account
    Create {
        email: String,
        password: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// Delete an account by email
    Delete { email: String },
    /// Flip an account between active and inactive
    Toggle { email: String },
    /// Account and document counts
    Stats,
    /// Create an admin, or reset an existing account to admin with a new password
    CreateAdmin { email: String, password: String },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgen_admin=info,docgen_db=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = Database::open(&config.db_path)?;
    info!("Using database {}", config.db_path.display());

    println!("{}", run(&db, cli.command)?);
    Ok(())
}

fn run(db: &Database, command: Command) -> Result<String> {
    match command {
        Command::List => list(db),
        Command::Create {
            email,
            password,
            username,
            role,
        } => create(db, &email, &password, username.as_deref(), role),
        Command::Delete { email } => delete(db, &email),
        Command::Toggle { email } => toggle(db, &email),
        Command::Stats => stats(db),
        Command::CreateAdmin { email, password } => create_admin(db, &email, &password),
    }
}

fn list(db: &Database) -> Result<String> {
    let users = db.list_users()?;
    if users.is_empty() {
        return Ok("No users found.".into());
    }

    let mut out = format!(
        "{:<32} {:<20} {:<6} {:<8} {:>5}  {}\n",
        "EMAIL", "NAME", "ROLE", "STATUS", "DOCS", "CREATED"
    );
    for row in &users {
        let user = row.to_api();
        out.push_str(&format!(
            "{:<32} {:<20} {:<6} {:<8} {:>5}  {}\n",
            user.email,
            user.display_name(),
            user.role,
            if user.is_active { "active" } else { "inactive" },
            user.documents_generated,
            user.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    out.push_str(&format!("\nTotal: {} users", users.len()));
    Ok(out)
}

fn check_credentials(email: &str, password: &str) -> Result<()> {
    if !is_email(email) {
        bail!("'{}' is not a valid email address", email);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }
    Ok(())
}

fn create(
    db: &Database,
    email: &str,
    password: &str,
    username: Option<&str>,
    role: Role,
) -> Result<String> {
    let email = email.trim();
    check_credentials(email, password)?;
    if db.get_user_by_email(email)?.is_some() {
        bail!("User {} already exists", email);
    }

    let username = username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default());
    let hash = hash_password(password)?;
    db.create_user(&NewUser {
        id: Uuid::new_v4(),
        email,
        username: Some(username),
        password_hash: &hash,
        role,
    })?;
    Ok(format!("Created {} {} ({})", role, email, username))
}

fn delete(db: &Database, email: &str) -> Result<String> {
    let Some(user) = db.get_user_by_email(email.trim())? else {
        bail!("User {} not found", email);
    };
    db.delete_user(&user.id)?;
    Ok(format!("Deleted {}", user.email))
}

fn toggle(db: &Database, email: &str) -> Result<String> {
    let Some(user) = db.get_user_by_email(email.trim())? else {
        bail!("User {} not found", email);
    };
    let active = !user.is_active;
    db.set_user_active(&user.id, active)?;
    Ok(format!(
        "{} is now {}",
        user.email,
        if active { "active" } else { "inactive" }
    ))
}

fn stats(db: &Database) -> Result<String> {
    let row = db.stats()?;
    let admins = row.admins;
    let stats = row.to_api();
    Ok(format!(
        "Users:     {} total, {} active, {} inactive, {} admins\n\
         Documents: {} total, {} sent, {} failed",
        stats.users.total,
        stats.users.active,
        stats.users.inactive,
        admins,
        stats.documents.total,
        stats.documents.sent,
        stats.documents.failed,
    ))
}

fn create_admin(db: &Database, email: &str, password: &str) -> Result<String> {
    let email = email.trim();
    check_credentials(email, password)?;

    let hash = hash_password(password)?;
    if db.reset_credentials(email, &hash, Role::Admin)? {
        return Ok(format!("Reset password for {} and granted admin", email));
    }

    db.create_user(&NewUser {
        id: Uuid::new_v4(),
        email,
        username: Some(email.split('@').next().unwrap_or_default()),
        password_hash: &hash,
        role: Role::Admin,
    })?;
    Ok(format!("Created admin {}", email))
}
