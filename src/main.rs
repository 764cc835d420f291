use chrono::Utc;
use clap::Parser;
use instapaper_archiver::archive::{ArchiveOptions, list_domains, run_archive};
use instapaper_archiver::config::{Action, Cli, Credentials, MAX_ENTRIES_LIMIT, api_base, load_dotenv};
use instapaper_archiver::instapaper::InstapaperClient;
use instapaper_archiver::rules::{RuleSet, RulesDocument};
use instapaper_archiver::unpack_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let dotenv_files = load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(files = ?dotenv_files, "loaded dotenv files");

    let creds = Credentials::from_env().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "credential check failed");
        eprintln!("Instapaper API key & credentials must be set using environment variables.");
        eprintln!("Copy .env.sample to .env and fill it out to provide credentials.");
        std::process::exit(1);
    });

    if args.entries_limit > MAX_ENTRIES_LIMIT {
        tracing::warn!(
            entries_limit = args.entries_limit,
            "entries limit is above the {} the API documents", MAX_ENTRIES_LIMIT
        );
    }

    let mut client = InstapaperClient::new(&creds.api_id, &creds.api_secret).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup http client");
        std::process::exit(1);
    });
    if let Some(base) = api_base() {
        client = client.with_base_url(&base);
    }

    if let Err(e) = client.login(&creds.login, &creds.password).await {
        eprintln!("Instapaper authentication failed: {}", unpack_error(&e));
        eprintln!("Check your credentials and try again.");
        std::process::exit(1);
    }

    let mut stdout = std::io::stdout().lock();

    let result = match args.action {
        Action::ListDomains => list_domains(&client, args.entries_limit, &mut stdout)
            .await
            .map(|domains| tracing::info!(count = domains.len(), "listed domains")),
        Action::Run => {
            let document = match &args.rules_file {
                Some(path) => match RulesDocument::load(path) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        eprintln!("{}", unpack_error(&e));
                        std::process::exit(1);
                    }
                },
                None => None,
            };
            let rules = RuleSet::build(args.max_age, args.only_domain.as_deref(), document);
            tracing::info!(
                default_max_age = rules.default_max_age_days(),
                overrides = rules.overrides().len(),
                only_domain = ?rules.only_domain(),
                "rules loaded"
            );

            let options = ArchiveOptions {
                entries_limit: args.entries_limit,
                dry_run: args.dry_run,
            };
            run_archive(&client, &rules, options, Utc::now(), &mut stdout)
                .await
                .map(|report| {
                    tracing::info!(affected = report.affected, archived = report.archived, "run complete")
                })
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %format!("{e:#}"), "run failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
