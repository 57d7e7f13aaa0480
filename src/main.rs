use clap::Parser;
use heartml::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> heartml::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heartml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download { url, out } => {
            cli::cmd_download(&url, &out)?;
        }
        Commands::Clean { input, out } => {
            cli::cmd_clean(&input, &out)?;
        }
        Commands::Eda { input, out } => {
            cli::cmd_eda(&input, &out)?;
        }
        Commands::Train {
            input,
            out_dir,
            experiments_dir,
            test_size,
            cv_folds,
            seed,
        } => {
            cli::cmd_train(&input, &out_dir, &experiments_dir, test_size, cv_folds, seed)?;
        }
        Commands::Serve {
            host,
            port,
            model_path,
        } => {
            cli::cmd_serve(host, port, model_path).await?;
        }
    }

    Ok(())
}
