use anyhow::{Context, Result};
use clap::Subcommand;
use permcache_authorizer::PermissionAuthorizer;
use permcache_config::{AuthorizerConfig, ConfigLoader};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

pub const EXIT_ALLOWED: u8 = 0;
pub const EXIT_DENIED: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask whether a bearer token holds a permission
    Check {
        /// Bearer token of the subject being checked
        #[arg(long)]
        token: String,

        /// Permission name, e.g. product-view
        #[arg(long)]
        permission: String,

        /// Run the check this many times against one authorizer
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,
    },

    /// Log in to the authority and print the credential fingerprint
    Login,
}

impl Commands {
    pub async fn execute(self, config_file: Option<&Path>) -> Result<ExitCode> {
        let config = load_config(config_file)?;
        let authorizer =
            PermissionAuthorizer::from_config(&config).context("failed to build authorizer")?;

        match self {
            Commands::Check {
                token,
                permission,
                repeat,
            } => check(&authorizer, &token, &permission, repeat).await,
            Commands::Login => login(&authorizer).await,
        }
    }
}

fn load_config(config_file: Option<&Path>) -> Result<AuthorizerConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config_file {
        loader = loader.file(path);
    }
    let config = loader.load().context("failed to load configuration")?;
    info!(source = ?config.source, "configuration loaded");
    Ok(config)
}

async fn check(
    authorizer: &PermissionAuthorizer,
    token: &str,
    permission: &str,
    repeat: u32,
) -> Result<ExitCode> {
    let mut allowed = false;
    for _ in 0..repeat {
        allowed = authorizer
            .is_authorized(token, permission)
            .await
            .with_context(|| format!("permission check for '{permission}' failed"))?;
    }

    let stats = authorizer.stats();
    println!(
        "{}",
        serde_json::json!({
            "permission": permission,
            "allowed": allowed,
            "stats": stats,
        })
    );
    eprintln!("{stats}");

    Ok(ExitCode::from(if allowed { EXIT_ALLOWED } else { EXIT_DENIED }))
}

async fn login(authorizer: &PermissionAuthorizer) -> Result<ExitCode> {
    let credential = authorizer
        .application_credential()
        .await
        .context("login to the authority failed")?;

    println!("application credential sha256:{}", credential.fingerprint());
    Ok(ExitCode::from(EXIT_ALLOWED))
}
