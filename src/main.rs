use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use gazette::{
    application::{
        error::AppError,
        session::{FeedSession, FeedSnapshot},
        source::PublicationSource,
    },
    config::{self, BrowseArgs, FeedSettings},
    domain::{entities::PublicationRecord, query::QueryParams},
    infra::{
        error::InfraError,
        http::{self, HttpPublicationSource},
        telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(
            error = %error,
            message = error.presentation_message(),
            "application error"
        );
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(
            error = %error,
            message = error.presentation_message(),
            "application error"
        );
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let source = build_source(&settings.source)?;

    match cli_args.command {
        config::Command::Browse(args) => run_browse(source, &settings.feed, args).await,
        config::Command::Categories => run_categories(source.as_ref()).await,
    }
}

fn build_source(
    settings: &config::SourceSettings,
) -> Result<Arc<HttpPublicationSource>, AppError> {
    let base_url = settings.base_url.as_ref().ok_or_else(|| {
        AppError::validation(
            "source.base_url is required (use --base-url or GAZETTE__SOURCE__BASE_URL)",
        )
    })?;
    let user_agent = settings
        .user_agent
        .as_deref()
        .unwrap_or(http::default_user_agent());

    let source = HttpPublicationSource::new(base_url.as_str(), user_agent)?;
    Ok(Arc::new(source))
}

fn browse_query(args: &BrowseArgs, feed: &FeedSettings) -> QueryParams {
    let mut query = match args.admin {
        Some(admin) => QueryParams::for_admin(admin),
        None => QueryParams::published().with_cap(feed.result_cap),
    };
    if let Some(status) = args.status {
        query = query.with_status(status);
    }
    if let Some(sort) = args.sort {
        query = query.with_sort(sort);
    }
    if let Some(term) = args.search.as_deref() {
        query = query.with_search(term);
    }
    if let Some(category) = args.category {
        query = query.with_category(Some(category));
    }
    if let Some(cap) = args.cap {
        query = query.with_cap(cap);
    }
    query
}

#[derive(Serialize)]
struct PageView<'a> {
    page: usize,
    has_more: bool,
    total: usize,
    records: &'a [PublicationRecord],
}

async fn run_browse(
    source: Arc<HttpPublicationSource>,
    feed: &FeedSettings,
    args: BrowseArgs,
) -> Result<(), AppError> {
    let query = browse_query(&args, feed);
    info!(
        target = "gazette::browse",
        sort = query.sort().as_str(),
        status = query.status().as_str(),
        cap = query.cap(),
        pages = args.pages,
        "Starting browse"
    );

    let session = FeedSession::new(source, feed.session_options());
    session.set_query(query);
    let mut snapshot = session.settled().await;

    if let Some(message) = snapshot.error.clone() {
        session.teardown();
        return Err(AppError::feed_unavailable(message));
    }

    let mut printed = 0usize;
    for requested in 1..=args.pages.max(1) {
        printed = print_page(&snapshot, printed)?;
        if requested == args.pages || !snapshot.has_more {
            break;
        }
        if !session.load_more() {
            break;
        }
        snapshot = session.settled().await;
    }

    session.teardown();
    Ok(())
}

/// Print the records revealed since `already_printed`; returns the new count.
fn print_page(snapshot: &FeedSnapshot, already_printed: usize) -> Result<usize, AppError> {
    let fresh = snapshot.displayed.get(already_printed..).unwrap_or_default();
    let view = PageView {
        page: snapshot.page,
        has_more: snapshot.has_more,
        total: snapshot.records.len(),
        records: fresh,
    };
    write_json(&view)?;
    Ok(snapshot.displayed.len())
}

async fn run_categories(source: &dyn PublicationSource) -> Result<(), AppError> {
    let categories = source.list_categories().await?;
    info!(
        target = "gazette::categories",
        count = categories.len(),
        "Fetched category catalog"
    );
    write_json(&categories)
}

fn write_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(InfraError::from)?;
    Ok(())
}
