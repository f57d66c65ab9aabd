//! CLI command implementations

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use tidepool_core::config::TidepoolConfig;
use tidepool_core::selection::source::FragmentGenerator;
use tidepool_core::session::SessionRequest;
use tidepool_core::{
    Fragment, FragmentSource, PlaybackMode, SelectionRequest, SessionType, StreamRef, TimeRange,
    TimestampOrigin, select,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a window selection over a JSON fragment listing
    Select {
        /// Path to a JSON array of fragment metadata
        fragments: PathBuf,
        /// Timestamp origin: producer or server
        #[arg(long, default_value = "producer")]
        origin: TimestampOrigin,
        /// Playback mode: live, live-replay, or on-demand
        #[arg(long, default_value = "on-demand")]
        mode: PlaybackMode,
        /// Window start (RFC 3339), required for bounded modes
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Window end (RFC 3339), required for bounded modes
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Page size
        #[arg(short, long, default_value = "100")]
        max_results: u32,
        /// Continuation token from a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Emit the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Validate a playback-session request without issuing anything
    ValidateSession {
        /// Stream name (mutually exclusive with --arn)
        #[arg(long)]
        name: Option<String>,
        /// Stream ARN (mutually exclusive with --name)
        #[arg(long)]
        arn: Option<String>,
        /// Session type: hls, dash, or clip
        #[arg(long, default_value = "hls")]
        session_type: SessionType,
        /// Playback mode: live, live-replay, or on-demand
        #[arg(long, default_value = "live")]
        mode: PlaybackMode,
        /// Timestamp origin: producer or server
        #[arg(long, default_value = "producer")]
        origin: TimestampOrigin,
        /// Window start (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Window end (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Session URL expiry in seconds
        #[arg(long, default_value = "300")]
        expires_secs: u64,
        /// Manifest/clip fragment count (per-type default when omitted)
        #[arg(long)]
        max_fragments: Option<u32>,
    },
    /// Generate a simulated fragment listing as JSON on stdout
    Generate {
        /// Number of fragments to generate
        #[arg(short, long, default_value = "100")]
        count: usize,
        /// Deterministic seed
        #[arg(long)]
        seed: Option<u64>,
        /// Producer timestamp of the first fragment (RFC 3339, default now)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Number assigned to the first fragment
        #[arg(long, default_value = "1")]
        first_number: u64,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Select {
            fragments,
            origin,
            mode,
            start,
            end,
            max_results,
            cursor,
            json,
        } => {
            run_select(
                fragments,
                origin,
                mode,
                window_from(start, end)?,
                max_results,
                cursor,
                json,
            )
            .await
        }
        Commands::ValidateSession {
            name,
            arn,
            session_type,
            mode,
            origin,
            start,
            end,
            expires_secs,
            max_fragments,
        } => {
            validate_session(
                name,
                arn,
                session_type,
                mode,
                origin,
                window_from(start, end)?,
                expires_secs,
                max_fragments,
            )
        }
        Commands::Generate {
            count,
            seed,
            start,
            first_number,
        } => generate_listing(count, seed, start, first_number),
    }
}

/// Builds a time range from the optional start/end pair.
fn window_from(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> anyhow::Result<Option<TimeRange>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(TimeRange::new(start, end)?)),
        (None, None) => Ok(None),
        _ => bail!("--start and --end must be given together"),
    }
}

/// Run a selection over a fragment listing file
///
/// # Errors
/// - Listing file unreadable or not a JSON fragment array
/// - Selection request fails validation
async fn run_select(
    listing: PathBuf,
    origin: TimestampOrigin,
    mode: PlaybackMode,
    range: Option<TimeRange>,
    max_results: u32,
    cursor: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read(&listing)
        .await
        .with_context(|| format!("reading {}", listing.display()))?;
    let fragments: Vec<Fragment> =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", listing.display()))?;
    tracing::debug!(count = fragments.len(), "loaded fragment listing");

    // Stage the listing behind the source seam, the way a real archive
    // query would supply it.
    let store = tidepool_core::selection::SimulatedStreamStore::new();
    store.register_stream("listing");
    store.ingest_all("listing", fragments)?;
    let stream = StreamRef::from_name("listing")?;
    let candidates = store.fetch_fragments(&stream, range.as_ref()).await?;

    let request = SelectionRequest {
        origin,
        mode,
        range,
        max_results,
        cursor: cursor.map(tidepool_core::ContinuationCursor::from_token),
    };
    let config = TidepoolConfig::from_env();
    let result = select(&candidates, &request, &config.selection, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} fragment(s) selected from {} candidate(s)",
        result.fragment_count(),
        candidates.len()
    );
    for fragment in &result.fragments {
        println!(
            "  #{:<12} {}  {:>9} bytes  {} ms",
            fragment.number,
            fragment.timestamp(origin).to_rfc3339(),
            fragment.size_bytes,
            fragment.duration_ms
        );
    }
    match &result.next_cursor {
        Some(cursor) => println!("Next page: --cursor {}", cursor.as_str()),
        None => println!("No more pages"),
    }

    Ok(())
}

/// Validate a session request and report the outcome
///
/// # Errors
/// - Stream identifier pair invalid
/// - Any session validation rule fails
#[allow(clippy::too_many_arguments)]
fn validate_session(
    name: Option<String>,
    arn: Option<String>,
    session_type: SessionType,
    mode: PlaybackMode,
    origin: TimestampOrigin,
    range: Option<TimeRange>,
    expires_secs: u64,
    max_fragments: Option<u32>,
) -> anyhow::Result<()> {
    let stream = StreamRef::resolve(name.as_deref(), arn.as_deref())?;

    let mut request = SessionRequest::new(stream, session_type, mode)
        .with_origin(origin)
        .with_expires(Duration::from_secs(expires_secs));
    if let Some(range) = range {
        request = request.with_range(range);
    }
    if let Some(max_fragments) = max_fragments {
        request = request.with_max_fragments(max_fragments);
    }

    let config = TidepoolConfig::from_env();
    request.validate(&config, Utc::now())?;

    println!(
        "Valid {} session request for stream {} ({} fragment ceiling, {}s expiry)",
        request.session_type,
        request.stream,
        request.resolved_max_fragments(&config),
        request.expires.as_secs()
    );

    Ok(())
}

/// Generate a simulated fragment listing
///
/// # Errors
/// - JSON serialization of the listing fails
fn generate_listing(
    count: usize,
    seed: Option<u64>,
    start: Option<DateTime<Utc>>,
    first_number: u64,
) -> anyhow::Result<()> {
    let mut config = TidepoolConfig::from_env().simulation;
    if seed.is_some() {
        config.deterministic_seed = seed;
    }

    let start = start.unwrap_or_else(Utc::now);
    let mut generator = FragmentGenerator::new(config);
    let fragments = generator.generate(start, first_number, count);

    println!("{}", serde_json::to_string_pretty(&fragments)?);
    Ok(())
}
