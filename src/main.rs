//! # pool-provisioner
//!
//! Bulk-creates user-pool accounts from a CSV of emails and initial passwords,
//! skipping accounts that already exist.
//!
//! ```bash
//! POOL_PROVISIONER_POOL_ID=ap-northeast-1_AbCdEf123 \
//! POOL_PROVISIONER_BOOTSTRAP_PASSWORD='...' \
//! pool-provisioner --input users.csv --email-column メールアドレス --password-column 初期パスワード
//! ```
//!
//! Progress lines go through the logger (`RUST_LOG` overrides the default `info`
//! level); the final summary is printed to stdout. The exit code is non-zero when
//! the run aborted or any row failed.

use clap::{Parser, ValueEnum};
use pool_provisioner::store::InMemoryStore;
use pool_provisioner::{
    FailurePolicy, IdentityStore, InputColumns, ProvisionError, ProvisionReport,
    ProvisionRequest, Provisioner, ProvisionerConfig, read_requests_from_path,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// AWS Cognito user pool
    Cognito,
    /// Empty in-process pool, for checking input files
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "pool-provisioner", version, about)]
struct Args {
    /// CSV file with one row per desired account
    #[arg(long, short)]
    input: PathBuf,

    /// User pool identifier
    #[arg(long, env = "POOL_PROVISIONER_POOL_ID")]
    pool_id: String,

    /// Shared temporary password used to create accounts before their real password is set
    #[arg(long, env = "POOL_PROVISIONER_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    bootstrap_password: String,

    /// Header label of the email column
    #[arg(long, default_value = pool_provisioner::input::DEFAULT_EMAIL_COLUMN)]
    email_column: String,

    /// Header label of the initial-password column
    #[arg(long, default_value = pool_provisioner::input::DEFAULT_PASSWORD_COLUMN)]
    password_column: String,

    /// Record failed rows and keep going instead of stopping at the first failure
    #[arg(long)]
    continue_on_error: bool,

    /// Rows in flight at once (requires --continue-on-error)
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Report what would be created without changing the pool
    #[arg(long)]
    dry_run: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Identity-store backend
    #[arg(long, value_enum, default_value_t = Backend::Cognito)]
    backend: Backend,

    /// AWS region override for the Cognito backend
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every row succeeded.
async fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let columns = InputColumns::new(&args.email_column, &args.password_column);
    let requests = read_requests_from_path(&args.input, &columns)?;
    log::info!(
        "Loaded {} requests from {}",
        requests.len(),
        args.input.display()
    );

    let policy = if args.continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let config = ProvisionerConfig::builder()
        .with_pool_id(&args.pool_id)
        .with_bootstrap_password(args.bootstrap_password.as_str())
        .with_failure_policy(policy)
        .with_concurrency(args.concurrency)
        .with_dry_run(args.dry_run)
        .build()?;

    match args.backend {
        Backend::Memory => {
            execute(InMemoryStore::new(&args.pool_id), config, &requests, args.json).await
        }
        Backend::Cognito => run_cognito(args.region, config, &requests, args.json).await,
    }
}

#[cfg(feature = "cognito")]
async fn run_cognito(
    region: Option<String>,
    config: ProvisionerConfig,
    requests: &[ProvisionRequest],
    json: bool,
) -> Result<bool, Box<dyn Error>> {
    let store = pool_provisioner::store::CognitoStore::from_env(region).await;
    execute(store, config, requests, json).await
}

#[cfg(not(feature = "cognito"))]
async fn run_cognito(
    _region: Option<String>,
    _config: ProvisionerConfig,
    _requests: &[ProvisionRequest],
    _json: bool,
) -> Result<bool, Box<dyn Error>> {
    Err("this build does not include the Cognito backend (enable the `cognito` feature)".into())
}

async fn execute<S: IdentityStore>(
    store: S,
    config: ProvisionerConfig,
    requests: &[ProvisionRequest],
    json: bool,
) -> Result<bool, Box<dyn Error>> {
    let provisioner = Provisioner::new(store, config)?;

    match provisioner.provision(requests).await {
        Ok(report) => {
            print_report(&report, json)?;
            Ok(report.is_success())
        }
        Err(ProvisionError::RowFailed {
            row,
            email,
            step,
            source,
            report,
        }) => {
            log::error!("Row {} ({}) failed at {}: {}", row, email, step, source);
            log::error!("Run aborted; rows after {} were not attempted", row);
            print_report(&report, json)?;
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &ProvisionReport, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        for failure in report.failures() {
            if let pool_provisioner::RowOutcome::Failed { step, message, .. } = &failure.outcome {
                println!(
                    "  row {} {} failed at {}: {}",
                    failure.row, failure.email, step, message
                );
            }
        }
        println!("{}", report.summary());
        println!("Done.");
    }
    Ok(())
}
