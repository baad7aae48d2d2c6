//! Scores one day of visits for a counter and optionally uploads the result.
//!
//! Usage:
//!
//! ```text
//! score_visits <YYYY-MM-DD> [--upload <target>]
//! ```
//!
//! The counter and API token come from `METRIKA_COUNTER` and `METRIKA_TOKEN`.
//! Every other setting is read through [`PipelineConfig`]; when
//! `DATABASE_URL` is set, tasks and uploads are kept in `PostgreSQL`,
//! otherwise they live in memory for the duration of the run.

use metrika_score::config::PipelineConfig;
use metrika_score::conversion::adapters::memory::InMemoryUploadRepository;
use metrika_score::conversion::adapters::postgres::PostgresUploadRepository;
use metrika_score::conversion::ports::UploadRepository;
use metrika_score::conversion::services::{
    ConversionUploadCoordinator, TaskUploadRequest, UploadPolling,
};
use metrika_score::metrika::{MetrikaLogSource, MetrikaReportingApi};
use metrika_score::persistence::build_pool;
use metrika_score::task::adapters::classifier::EngagementRuleClassifier;
use metrika_score::task::adapters::memory::InMemoryTaskRepository;
use metrika_score::task::adapters::postgres::PostgresTaskRepository;
use metrika_score::task::ports::TaskRepository;
use metrika_score::task::services::{CreateTaskRequest, ScoringScheduler, TaskLifecycleService};
use metrika_score::telemetry::init_tracing;
use mockable::DefaultClock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const USAGE: &str = "score_visits <YYYY-MM-DD> [--upload <target>]";

/// Errors raised while reading the command line and credentials.
#[derive(Debug, Error, PartialEq, Eq)]
enum CliError {
    #[error("invalid arguments: {0}; usage: {USAGE}")]
    Usage(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("METRIKA_COUNTER must be an integer, got '{0}'")]
    InvalidCounter(String),
}

/// Parsed command line.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    date: String,
    upload_target: Option<String>,
}

/// Counter credentials for the run.
struct Credentials {
    counter: i64,
    token: String,
}

fn parse_args<I>(raw: I) -> Result<Args, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = raw.into_iter();
    let date = args
        .next()
        .ok_or_else(|| CliError::Usage("missing date".to_owned()))?;
    let upload_target = match args.next().as_deref() {
        None => None,
        Some("--upload") => Some(
            args.next()
                .ok_or_else(|| CliError::Usage("--upload needs a target".to_owned()))?,
        ),
        Some(other) => return Err(CliError::Usage(format!("unexpected argument '{other}'"))),
    };
    if let Some(extra) = args.next() {
        return Err(CliError::Usage(format!("unexpected argument '{extra}'")));
    }
    Ok(Args {
        date,
        upload_target,
    })
}

fn read_credentials<F>(lookup: F) -> Result<Credentials, CliError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let raw_counter = lookup("METRIKA_COUNTER").ok_or(CliError::MissingEnv("METRIKA_COUNTER"))?;
    let counter = raw_counter
        .trim()
        .parse::<i64>()
        .map_err(|_| CliError::InvalidCounter(raw_counter.clone()))?;
    let token = lookup("METRIKA_TOKEN").ok_or(CliError::MissingEnv("METRIKA_TOKEN"))?;
    Ok(Credentials { counter, token })
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing("info")?;
    let args = parse_args(std::env::args().skip(1))?;
    let config = PipelineConfig::from_env()?;
    let credentials = read_credentials(|key| std::env::var(key).ok())?;

    let log_source = Arc::new(MetrikaLogSource::from_config(&config)?);
    let reporting = Arc::new(MetrikaReportingApi::from_config(&config)?);

    if let Some(url) = config.database_url.as_deref() {
        info!("using PostgreSQL stores");
        let pool = build_pool(url, config.database_pool_size)?;
        let stores = Stores {
            tasks: Arc::new(PostgresTaskRepository::new(pool.clone())),
            uploads: Arc::new(PostgresUploadRepository::new(pool)),
        };
        run(stores, log_source, reporting, &config, args, credentials).await
    } else {
        info!("DATABASE_URL not set, using in-memory stores");
        let stores = Stores {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            uploads: Arc::new(InMemoryUploadRepository::new()),
        };
        run(stores, log_source, reporting, &config, args, credentials).await
    }
}

struct Stores<T, U> {
    tasks: Arc<T>,
    uploads: Arc<U>,
}

async fn run<T, U>(
    stores: Stores<T, U>,
    log_source: Arc<MetrikaLogSource>,
    reporting: Arc<MetrikaReportingApi>,
    config: &PipelineConfig,
    args: Args,
    credentials: Credentials,
) -> Result<(), BoxError>
where
    T: TaskRepository + 'static,
    U: UploadRepository + 'static,
{
    let clock = Arc::new(DefaultClock);
    let lifecycle = Arc::new(TaskLifecycleService::new(
        Arc::clone(&stores.tasks),
        Arc::clone(&clock),
    ));
    let scheduler = ScoringScheduler::new(
        lifecycle,
        log_source,
        Arc::new(EngagementRuleClassifier::default()),
    );

    let submitted = scheduler
        .submit(CreateTaskRequest::new(
            args.date,
            credentials.counter,
            credentials.token.clone(),
        ))
        .await?;
    let task_id = submitted.task.id();
    info!(task_id = %task_id, "scoring task submitted");

    let task = submitted.handle.await??;
    let result = scheduler.lifecycle().finished_result(task.id()).await?;
    info!(
        task_id = %task_id,
        status = task.status().as_str(),
        visits = result.visits().len(),
        "scoring finished"
    );

    let Some(target) = args.upload_target else {
        return Ok(());
    };

    let coordinator =
        ConversionUploadCoordinator::new(stores.uploads, stores.tasks, reporting, clock)
            .with_polling(UploadPolling::from_config(config));
    let created = coordinator
        .upload_from_task(TaskUploadRequest {
            task_id,
            target,
            counter: credentials.counter,
            token: credentials.token,
        })
        .await?;
    info!(upload_id = %created.id(), status = created.status().as_str(), "upload created");

    let upload = coordinator.reconcile(created.id()).await?;
    if !upload.status().is_terminal() {
        return Ok(());
    }

    info!(
        upload_id = %upload.id(),
        status = upload.status().as_str(),
        processed = upload.processed(),
        total = upload.total(),
        "upload finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| (*arg).to_owned()).collect()
    }

    #[test]
    fn date_alone_skips_upload() {
        let args = parse_args(owned(&["2025-07-01"])).expect("args parse");
        assert_eq!(
            args,
            Args {
                date: "2025-07-01".to_owned(),
                upload_target: None
            }
        );
    }

    #[test]
    fn upload_flag_takes_a_target() {
        let args = parse_args(owned(&["2025-07-01", "--upload", "engaged"])).expect("args parse");
        assert_eq!(args.upload_target.as_deref(), Some("engaged"));
    }

    #[rstest]
    #[case(&[])]
    #[case(&["2025-07-01", "--upload"])]
    #[case(&["2025-07-01", "--verbose"])]
    #[case(&["2025-07-01", "--upload", "engaged", "extra"])]
    fn malformed_command_lines_are_rejected(#[case] args: &[&str]) {
        assert!(matches!(parse_args(owned(args)), Err(CliError::Usage(_))));
    }

    #[test]
    fn credentials_require_a_numeric_counter() {
        let result = read_credentials(|key| match key {
            "METRIKA_COUNTER" => Some("abc".to_owned()),
            "METRIKA_TOKEN" => Some("token".to_owned()),
            _ => None,
        });
        assert!(matches!(result, Err(CliError::InvalidCounter(_))));
    }

    #[test]
    fn credentials_require_a_token() {
        let result = read_credentials(|key| (key == "METRIKA_COUNTER").then(|| "42".to_owned()));
        assert!(matches!(result, Err(CliError::MissingEnv("METRIKA_TOKEN"))));
    }
}
