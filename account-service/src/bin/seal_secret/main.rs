use clap::Parser;
use clap::Subcommand;
use credentials::EncryptedSecret;
use credentials::SecretCipher;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Encrypt and decrypt `ENC(...)` configuration values.
#[derive(Debug, Parser)]
#[command(name = "seal-secret", version)]
struct Cli {
    /// Master key used to derive the encryption key
    #[arg(long, env = "SECRETS_MASTER_KEY", hide_env_values = true)]
    master_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encrypt a plaintext value and print it as ENC(...)
    Encrypt { value: String },

    /// Decrypt an ENC(...) value or a bare base64 payload
    Decrypt { value: String },
}

fn run(cli: Cli) -> Result<String, anyhow::Error> {
    let master_key = SecretString::from(cli.master_key);
    if master_key.expose_secret().trim().is_empty() {
        anyhow::bail!("master key must not be blank");
    }

    let cipher = SecretCipher::new();
    let output = match cli.command {
        Command::Encrypt { value } => cipher
            .seal(&value, master_key.expose_secret())?
            .to_string(),
        Command::Decrypt { value } => match EncryptedSecret::parse(&value) {
            Some(secret) => cipher.open(&secret, master_key.expose_secret())?,
            None => cipher.decrypt(&value, master_key.expose_secret())?,
        },
    };

    Ok(output)
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seal_secret=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let operation = match cli.command {
        Command::Encrypt { .. } => "encrypt",
        Command::Decrypt { .. } => "decrypt",
    };

    let output = run(cli).inspect_err(|e| tracing::error!(operation, error = %e, "Failed"))?;
    println!("{}", output);

    Ok(())
}
