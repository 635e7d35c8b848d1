use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod console;
mod dashboard;
mod error;
mod filter;
mod models;
mod panels;
mod report;
mod selection;
mod store;

use console::{Action, Command, Console, Outcome};
use dashboard::{format_population_millions, map_markers, DashboardStats};
use models::{Category, CrisisRecord, FilterCriteria, Severity, Trend};
use report::{ExportFormat, ReportInput};
use store::CrisisStore;

#[derive(Parser)]
#[command(name = "crisis-console")]
#[command(about = "Crisis intelligence console over a static crisis dataset", long_about = None)]
struct Cli {
    /// JSON or CSV crisis data; the built-in dataset is used when absent
    #[arg(long, global = true, env = "CRISIS_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List crises matching the filters
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Select a crisis and show its detail panel
    Show { id: String },
    /// Route a spoken command to a panel action
    Voice {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Dashboard figures and map markers for the filtered view
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
        /// Print figures and markers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Filter panel listing with per-value counts
    Facets {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write a report of the filtered view
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
        #[arg(long, env = "CRISIS_EXPORT_DIR", default_value = ".")]
        out: PathBuf,
        /// Crisis to include as the selected crisis
        #[arg(long)]
        select: Option<String>,
    },
    /// Interactive console reading commands from stdin
    Shell,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, value_enum)]
    severity: Vec<Severity>,
    #[arg(long, value_enum)]
    category: Vec<Category>,
    #[arg(long)]
    region: Vec<String>,
    #[arg(long, value_enum)]
    trend: Vec<Trend>,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(args: FilterArgs) -> Self {
        FilterCriteria {
            search: args.search,
            severities: args.severity.into_iter().collect(),
            categories: args.category.into_iter().collect(),
            regions: args.region.into_iter().collect(),
            trends: args.trend.into_iter().collect(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crisis_console=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = match &cli.data {
        Some(path) => CrisisStore::load_path(path)
            .with_context(|| format!("failed to load crisis data from {}", path.display()))?,
        None => CrisisStore::builtin(),
    };
    if store.is_empty() {
        warn!("crisis store is empty");
    }

    match cli.command {
        Commands::List { filters } => {
            let console = filtered_console(&store, filters);
            if console.filtered().is_empty() {
                println!("No crises match these filters.");
                return Ok(());
            }

            println!(
                "{} of {} crises ({}):",
                console.filtered().len(),
                store.len(),
                console.criteria().summary()
            );
            for crisis in console.filtered() {
                println!(
                    "- {} [{}] {} ({}), {} confidence {}%",
                    crisis.id,
                    crisis.severity_label(),
                    crisis.title,
                    crisis.place_label(),
                    crisis.category_label(),
                    crisis.confidence
                );
            }
        }
        Commands::Show { id } => {
            let mut console = Console::new(&store);
            if let Outcome::UnknownCrisis(id) = console.dispatch(Action::SelectCrisis(id)) {
                anyhow::bail!("no crisis with id {id}");
            }
            if let Some(crisis) = console.selected() {
                print_detail(&store, crisis);
            }
        }
        Commands::Voice { text } => {
            let mut console = Console::new(&store);
            let command = text.join(" ");
            match console.dispatch(Action::Voice(command)) {
                Outcome::Panels(mutations) => {
                    for mutation in mutations {
                        println!("{mutation}");
                    }
                }
                _ => println!("No matching command."),
            }
        }
        Commands::Stats { filters, json } => {
            let console = filtered_console(&store, filters);
            let stats = DashboardStats::compute(console.filtered().iter().copied());
            let markers = map_markers(console.filtered().iter().copied(), None);
            if json {
                let body = serde_json::json!({
                    "stats": stats,
                    "affected_label": stats.affected_label(),
                    "markers": markers,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            println!("Crises: {} ({} active)", stats.total, stats.active);
            println!("People affected: {}", stats.affected_label());
            println!("By severity:");
            for (severity, count) in &stats.by_severity {
                println!("- {severity}: {count}");
            }
            println!("By category:");
            for (category, count) in &stats.by_category {
                println!("- {category}: {count}");
            }
            println!("Map markers:");
            for marker in markers {
                println!(
                    "- {} at {:.1}% / {:.1}% ({})",
                    marker.id,
                    marker.left,
                    marker.top,
                    marker.severity.map_or("unknown", Severity::as_str)
                );
            }
        }
        Commands::Facets { filters } => {
            let criteria: FilterCriteria = filters.into();
            let facets = filter::facets(store.records(), &criteria);
            println!("{}", serde_json::to_string_pretty(&facets)?);
        }
        Commands::Export {
            filters,
            format,
            out,
            select,
        } => {
            let mut console = filtered_console(&store, filters);
            if let Some(id) = select {
                if let Outcome::UnknownCrisis(id) = console.dispatch(Action::SelectCrisis(id)) {
                    anyhow::bail!("no crisis with id {id}");
                }
            }

            let selected = console.selected();
            let input = ReportInput {
                criteria: console.criteria(),
                crises: console.filtered(),
                selected,
                related: selected.map(|crisis| store.related(crisis)).unwrap_or_default(),
                generated_at: Utc::now(),
            };
            let body = report::render(format, &input)?;

            std::fs::create_dir_all(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let path = out.join(report::export_filename(format, Utc::now().date_naive()));
            std::fs::write(&path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), crises = input.crises.len(), "report exported");
            println!("Report written to {}.", path.display());
        }
        Commands::Shell => run_shell(&store)?,
    }

    Ok(())
}

fn filtered_console(store: &CrisisStore, filters: FilterArgs) -> Console<'_> {
    let mut console = Console::new(store);
    console.dispatch(Action::SetCriteria(filters.into()));
    console
}

fn print_detail(store: &CrisisStore, crisis: &CrisisRecord) {
    println!("{} [{}]", crisis.title, crisis.severity_label().to_uppercase());
    println!("{}", crisis.place_label());
    println!(
        "Confidence {}% | {} affected | {} | trend {}",
        crisis.confidence,
        format_population_millions(crisis.affected_population),
        crisis.timeframe,
        crisis.trend_label()
    );
    println!();
    println!("{}", crisis.description);
    println!("Predicted impact: {}", crisis.predicted_impact);
    if !crisis.sources.is_empty() {
        println!("Sources: {}", crisis.sources.join(", "));
    }
    println!("Updated {}", crisis.last_updated.format("%Y-%m-%d %H:%M UTC"));

    let related = store.related(crisis);
    if !related.is_empty() {
        println!("Related:");
        for other in related {
            println!("- {} ({})", other.title, other.id);
        }
    }
}

fn run_shell(store: &CrisisStore) -> anyhow::Result<()> {
    let mut console = Console::new(store);
    console.subscribe_selection(|crisis| match crisis {
        Some(crisis) => info!(id = %crisis.id, "detail panel open"),
        None => info!("detail panel closed"),
    });

    println!("{} crises loaded. Type `quit` to leave.", store.len());
    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match console::parse_command(&line) {
            Command::Quit => break,
            Command::Status => print_status(&console),
            Command::Invalid(message) => println!("{message}"),
            Command::Act(action) => match console.dispatch(action) {
                Outcome::Panels(mutations) => {
                    for mutation in mutations {
                        println!("{mutation}");
                    }
                }
                Outcome::Selected { id, in_view } => {
                    if let Some(crisis) = store.get(&id) {
                        print_detail(store, crisis);
                    }
                    if !in_view {
                        println!("(hidden by current filters)");
                    }
                }
                Outcome::SelectionCleared => println!("Selection cleared."),
                Outcome::UnknownCrisis(id) => println!("No crisis with id {id}."),
                Outcome::Filtered { showing, total } => {
                    println!("Showing {showing} of {total} crises.");
                }
                Outcome::Unchanged => println!("Nothing changed."),
            },
        }
    }

    Ok(())
}

fn print_status(console: &Console<'_>) {
    println!(
        "Filters: {} ({} of {} shown)",
        console.criteria().summary(),
        console.filtered().len(),
        console.store().len()
    );
    match console.selected() {
        Some(crisis) => println!("Selected: {} ({})", crisis.title, crisis.id),
        None => println!("Selected: none"),
    }
    let open: Vec<String> = console
        .panels()
        .open_panels()
        .iter()
        .map(|panel| panel.to_string())
        .collect();
    if open.is_empty() {
        println!("Panels: none open");
    } else {
        println!("Panels: {}", open.join(", "));
    }
    if console.overlay_visible() {
        println!("Overlay backdrop visible (`dismiss` to close).");
    }
}
