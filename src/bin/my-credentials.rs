use std::{
    path::PathBuf,
    sync::Arc,
};

use anyhow::{
    Context,
    Result,
    anyhow,
};
use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use my_credentials::{
    config::{
        CredentialsConfig,
        SentryConfig,
    },
    credentials::{
        CredentialForm,
        CredentialsError,
    },
    k8s,
    masking::{
        KeyMasker,
        LastLineDetection,
    },
    observability,
    service::CredentialService,
    store::KubeSecretStore,
};
use rustls::crypto::aws_lc_rs;
use tokio::io::AsyncReadExt;
use tracing::{
    error,
    info,
};

#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq)]
enum LastLine {
    FirstEqual,
    Position,
}

impl From<LastLine> for LastLineDetection {
    fn from(value: LastLine) -> Self {
        match value {
            LastLine::FirstEqual => LastLineDetection::FirstEqual,
            LastLine::Position => LastLineDetection::Position,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "my-credentials", about = "Manage the Kubernetes Secrets owned by this namespace.")]
struct Config {
    #[clap(flatten)]
    credentials: CredentialsConfig,

    #[clap(flatten)]
    sentry: SentryConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a file (or stdin) with its private key body masked.
    Mask {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = LastLine::FirstEqual)]
        last_line: LastLine,
    },

    #[command(flatten)]
    Credentials(CredentialsCommand),
}

#[derive(Debug, Subcommand)]
enum CredentialsCommand {
    /// List credentials as JSON, optionally only those exposed to APP.
    List {
        #[arg(long)]
        app: Option<String>,
    },
    /// Show one credential as JSON.
    Show {
        name: String,

        /// Print values without masking private keys.
        #[arg(long)]
        reveal: bool,
    },
    /// Create a credential. Values written as @PATH are read from PATH.
    Create {
        name: String,

        #[arg(long = "type")]
        kind: Option<String>,

        #[arg(long = "entry", value_name = "KEY=VALUE", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
    },
    /// Replace the data of a credential; keys not given are removed.
    Update {
        name: String,

        #[arg(long = "type")]
        kind: Option<String>,

        #[arg(long = "entry", value_name = "KEY=VALUE", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
    },
    /// Expose or hide a credential in APP's environment.
    ToggleEnv { name: String, app: String },
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let _sentry = observability::init_tracing_and_sentry(config.sentry.clone());

    let result = match config.command {
        Command::Mask { input, last_line } => mask(input, last_line).await,
        Command::Credentials(command) => match connect(&config.credentials).await {
            Ok(service) => run(&service, command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = &result {
        error!("Command failed: {e:#}");
    }
    result
}

async fn mask(input: Option<PathBuf>, last_line: LastLine) -> Result<()> {
    let text = match &input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        },
    };

    let masker = KeyMasker::new().with_last_line_detection(last_line.into());
    let masked = masker
        .mask(&text)
        .context("Input does not look like a private key")?;
    print!("{masked}");
    Ok(())
}

async fn connect(config: &CredentialsConfig) -> Result<CredentialService> {
    aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install aws-lc-rs CryptoProvider");

    let namespace = k8s::resolve_namespace(config.namespace.as_deref())
        .await
        .context("Failed to get current Kubernetes namespace")?;
    let k8s_client = k8s::create_k8s_client()
        .await
        .context("Failed to create Kubernetes client")?;

    info!(namespace = %namespace, version = env!("CARGO_PKG_VERSION"), "Connected to Kubernetes");

    let store = KubeSecretStore::new(k8s_client, &namespace);
    Ok(CredentialService::new(Arc::new(store), config.clone()))
}

async fn run(service: &CredentialService, command: CredentialsCommand) -> Result<()> {
    match command {
        CredentialsCommand::List { app } => {
            let credentials = service.list_for_app(app.as_deref()).await.map_err(describe)?;
            let redacted: Vec<_> = credentials.iter().map(|c| c.redacted()).collect();
            println!("{}", serde_json::to_string_pretty(&redacted)?);
        },
        CredentialsCommand::Show { name, reveal } => {
            let credential = service.get(&name).await.map_err(describe)?;
            let credential = if reveal { credential } else { credential.redacted() };
            println!("{}", serde_json::to_string_pretty(&credential)?);
        },
        CredentialsCommand::Create { name, kind, entries } => {
            let form = build_form(&name, kind.as_deref(), entries).await?;
            service.create(&form).await.map_err(describe)?;
            println!("Created credential '{}'", form.name);
        },
        CredentialsCommand::Update { name, kind, entries } => {
            let form = build_form(&name, kind.as_deref(), entries).await?;
            service.update(&form.name, &form).await.map_err(describe)?;
            println!("Updated credential '{}'", form.name);
        },
        CredentialsCommand::ToggleEnv { name, app } => {
            let enabled = service.toggle_app_env(&name, &app).await.map_err(describe)?;
            let state = if enabled { "enabled" } else { "disabled" };
            println!("Credential '{name}' {state} for '{app}'");
        },
        CredentialsCommand::Delete { name } => {
            service.delete(&name).await.map_err(describe)?;
            println!("Deleted credential '{name}'");
        },
    }
    Ok(())
}

fn describe(err: CredentialsError) -> anyhow::Error {
    match &err {
        CredentialsError::Kube(kube::Error::Api(ae)) => {
            anyhow!("Status {} - {}: {}", ae.code, ae.reason, ae.message)
        },
        _ => anyhow::Error::new(err),
    }
}

fn parse_entry(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.trim().is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

async fn build_form(name: &str, kind: Option<&str>, entries: Vec<(String, String)>) -> Result<CredentialForm> {
    let mut form = CredentialForm::new(name);
    if let Some(kind) = kind {
        form = form.with_kind(kind);
    }

    for (key, value) in entries {
        let value = match value.strip_prefix('@') {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read value of '{key}' from {path}"))?,
            None => value,
        };
        form = form.with_entry(&key, &value);
    }
    Ok(form)
}
