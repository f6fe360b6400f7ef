//! nexus-deployments CLI

use clap::Parser;
use nexus_deployments::logging::setup_logging;
use nexus_deployments::{
    run, ConfigStore, HttpProbe, Listing, Outcome, Paths, ProbeSettings, Request,
};

/// Manage Nexus deployments.
#[derive(Parser)]
#[command(name = "nexus-deployments")]
#[command(about = "Manage Nexus deployments")]
struct Cli {
    /// Name of the Nexus deployment to be locally added
    #[arg(short, long, value_name = "NAME")]
    add: Option<String>,

    /// Name of the Nexus deployment to be locally removed
    #[arg(short, long, value_name = "NAME")]
    remove: Option<String>,

    /// Name of the Nexus deployment to be selected for subsequent CLI calls
    #[arg(short, long, value_name = "NAME")]
    select: Option<String>,

    /// URL of a Nexus deployment (for --add)
    #[arg(short, long)]
    url: Option<String>,

    /// List all Nexus deployments locally registered
    #[arg(short, long)]
    list: bool,

    /// Show count of entities when listing
    #[arg(short, long)]
    count: bool,

    /// Count only public entities (i.e. no authentication)
    #[arg(short, long)]
    public_only: bool,

    /// Print the registry file location and exit
    #[arg(long)]
    show_path: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let paths = Paths::resolve();
    if cli.show_path {
        println!("{}", paths.registry_path().display());
        return;
    }

    let store = ConfigStore::new(paths.registry_path());
    let probe = match HttpProbe::new(&ProbeSettings::from_env()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let request = Request {
        add: cli.add,
        remove: cli.remove,
        select: cli.select,
        url: cli.url,
        list: cli.list,
        count: cli.count,
        public_only: cli.public_only,
    };

    if request.is_empty() {
        println!("Nothing to do. Use --add, --remove, --select or --list (see --help).");
        return;
    }

    match run(&request, &store, &probe) {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => {
            print_outcome(&e.completed);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    if let Some(name) = &outcome.added {
        println!("Added deployment '{}'", name);
    }
    if let Some(name) = &outcome.removed {
        println!("Removed deployment '{}'", name);
    }
    for name in &outcome.unselected {
        println!("deployment '{}' was unselected", name);
    }
    if let Some(name) = &outcome.selected {
        println!("Selected deployment '{}'", name);
    }
    if let Some(listing) = &outcome.listing {
        for (name, e) in &listing.errors {
            eprintln!("Warning: could not count entities of '{}': {}", name, e);
        }
        if listing.rows.is_empty() {
            println!("No deployments registered. Add one with: nexus-deployments --add <name> --url <url>");
            return;
        }
        print_listing(listing);
    }
}

fn print_listing(listing: &Listing) {
    let headers = listing.headers();
    let rows: Vec<Vec<String>> = listing
        .rows
        .iter()
        .map(|r| {
            let mut cells = vec![
                r.name.clone(),
                if r.selected { "Yes".to_string() } else { String::new() },
                r.url.clone(),
            ];
            if let Some(count) = r.count {
                cells.push(count.to_string());
            }
            cells
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+", separator);

    println!("{}", separator);
    println!("{}", format_row(&headers, &widths));
    println!("{}", separator);
    for row in &rows {
        println!("{}", format_row(row, &widths));
    }
    println!("{}", separator);
}

/// Name and URL columns align left, the count column right, the rest centered.
fn format_row(cells: &[String], widths: &[usize]) -> String {
    let formatted: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| match i {
            0 | 2 => format!(" {:<w$} ", cell, w = w),
            3 => format!(" {:>w$} ", cell, w = w),
            _ => format!(" {:^w$} ", cell, w = w),
        })
        .collect();
    format!("|{}|", formatted.join("|"))
}
