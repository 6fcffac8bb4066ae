//! Visado - Entry Point
//!
//! One research run per invocation:
//!   visado --citizenship Canada --destination Japan --purpose Tourism
//!
//! --advisory additionally fetches destination tips, concurrently with
//! the research loop since the two share no session state.
//! --json-logs moves logs to stderr as JSON so stdout stays clean for
//! piping.

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use visado::research::{self, ProgressFn};
use visado::{assist, Concierge, Config, PolicyRecord, VisaQuery};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let json_logs = args.iter().any(|a| a == "--json-logs" || a == "-j");

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if json_logs {
        // Non-interactive runs - log to stderr as JSON
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // Interactive runs - log to stdout with colors
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Visado v{}", env!("CARGO_PKG_VERSION"));

    let citizenship = flag_value(&args, "--citizenship");
    let destination = flag_value(&args, "--destination");
    let (citizenship, destination) = match (citizenship, destination) {
        (Some(c), Some(d)) => (c, d),
        _ => {
            print_help();
            anyhow::bail!("--citizenship and --destination are required");
        }
    };
    let residency = flag_value(&args, "--residency").unwrap_or_else(|| citizenship.clone());
    let purpose = flag_value(&args, "--purpose").unwrap_or_else(|| "Tourism".to_string());
    let with_advisory = args.iter().any(|a| a == "--advisory" || a == "-a");

    let config = Config::from_env()?;
    let desk = Concierge::from_config(&config);
    let query = VisaQuery::new(&citizenship, &residency, &destination, &purpose);
    let progress = ProgressFn(|stage: &str| println!("  - {}", stage));

    let record = if with_advisory {
        let (record, tips) = futures_util::future::try_join(
            research::search_visa_info(&desk, &query, &progress),
            assist::travel_advisory(&desk, &destination),
        )
        .await?;

        if !tips.is_empty() {
            println!("\nTravel advisories for {}:", destination);
            for tip in &tips {
                println!("  [{}] {}", tip.category, tip.tip);
            }
        }
        record
    } else {
        research::search_visa_info(&desk, &query, &progress).await?
    };

    print_record(&record);

    let stats = desk.cache_stats();
    info!(
        "Cache: {} entries, {} hits, {} misses ({:.0}% hit rate)",
        stats.entries, stats.hits, stats.misses, stats.hit_rate_percent
    );

    Ok(())
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_record(record: &PolicyRecord) {
    println!(
        "\n{} -> {} ({})",
        record.citizenship, record.destination, record.purpose
    );
    println!("Status: {}", record.visa_status.label());
    println!(
        "Confidence: {:.1}/10{}",
        record.verification.score,
        if record.verification.passed {
            ""
        } else {
            "  (low - verify with official sources)"
        }
    );

    println!("\n{}", record.summary);

    if !record.next_steps.is_empty() {
        println!("\nNext steps:");
        for (i, step) in record.next_steps.iter().enumerate() {
            println!("  {}. {} - {}", i + 1, step.title, step.description);
        }
    }

    if !record.requirements.is_empty() {
        println!("\nRequired documents:");
        for requirement in &record.requirements {
            println!("  - {}", requirement);
        }
    }

    println!("\nTimeline: {}", record.timeline);

    if !record.sources.is_empty() {
        println!("\nSources:");
        for source in &record.sources {
            println!("  {} - {}", source.title, source.uri);
        }
    }
}

fn print_help() {
    println!("Visado v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: visado --citizenship <COUNTRY> --destination <COUNTRY> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --citizenship <COUNTRY>  Traveler's citizenship (required)");
    println!("  --destination <COUNTRY>  Destination country (required)");
    println!("  --residency <COUNTRY>    Country of residence (default: citizenship)");
    println!("  --purpose <PURPOSE>      Purpose of travel (default: Tourism)");
    println!("  --advisory, -a           Also fetch destination tips");
    println!("  --json-logs, -j          Log to stderr as JSON (keeps stdout pipeable)");
    println!("  --help, -h               Show this help");
    println!();
    println!("Environment variables:");
    println!("  GEMINI_API_KEY        Gemini API key (required)");
    println!("  VISADO_MODEL          Research model (default: gemini-2.5-flash)");
    println!("  VISADO_JUDGE_MODEL    Scoring model (default: same as VISADO_MODEL)");
    println!("  VISADO_TIMEOUT_SECS   HTTP timeout in seconds (default: 120)");
    println!("  VISADO_CACHE_ENABLED  Lookup caching on/off (default: true)");
    println!("  VISADO_CACHE_TTL      Cache TTL in seconds (default: 3600)");
    println!("  VISADO_SELECTION      Attempt returned on exhaustion: last|best (default: last)");
}
