use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use skycast_core::{AppError, Config, ConfigError};
use skycast_weather::{
    CityResolver, Dashboard, DayCard, FileCityStore, ForecastProvider, HourlyChart, ViewController,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "City weather dashboard for the terminal")]
struct Cli {
    /// Config file (defaults to <config dir>/skycast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List municipalities matching a partial name
    Search { query: String },
    /// Show day cards and the hourly chart
    Show {
        /// Select (and remember) this city first
        #[arg(long)]
        city: Option<String>,
        /// Day to chart, YYYY-MM-DD (defaults to the first forecast day)
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;
    let cli = Cli::parse();

    let config = match Config::load_validated(cli.config.as_deref()) {
        Ok((config, _)) => config,
        Err(e) => {
            let err = AppError::Config(ConfigError::Invalid(format!("{:#}", e)));
            eprintln!("{}", err.user_message());
            return Err(e);
        }
    };

    let weather = &config.weather;
    let mut dashboard = Dashboard::new(
        ViewController::new(FileCityStore::new(&config.config_dir), weather),
        Arc::new(CityResolver::from_config(weather).context("Failed to build geocoding client")?),
        Arc::new(ForecastProvider::from_config(weather).context("Failed to build forecast client")?),
    );

    match cli.command.unwrap_or(Command::Show {
        city: None,
        day: None,
        json: false,
    }) {
        Command::Search { query } => search(&mut dashboard, &query).await,
        Command::Show { city, day, json } => show(&mut dashboard, city, day, json).await,
        Command::Repl => repl(&mut dashboard).await,
    }
}

async fn search(dashboard: &mut Dashboard, query: &str) -> Result<()> {
    dashboard.type_query(query);
    dashboard.settle().await;
    print_suggestions(dashboard.controller().suggestions());
    Ok(())
}

async fn show(
    dashboard: &mut Dashboard,
    city: Option<String>,
    day: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    match city {
        Some(city) => dashboard.select_city(&city),
        None => dashboard.mount(),
    }
    dashboard.settle().await;

    if let Some(day) = day {
        if !dashboard.select_day(day) {
            tracing::warn!("{} is not in the forecast, keeping the first day", day);
        }
    }

    if json {
        let view = serde_json::json!({
            "city": dashboard.controller().city(),
            "loading": dashboard.controller().is_loading(),
            "days": dashboard.controller().day_cards(),
            "chart": dashboard.controller().hourly_chart(),
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        render(dashboard);
    }
    Ok(())
}

const REPL_HELP: &str = "\
Type a city name to search.
  :pick N   select suggestion N
  :day N    chart day card N
  :dismiss  hide suggestions
  :show     redraw
  :quit     exit";

async fn repl(dashboard: &mut Dashboard) -> Result<()> {
    dashboard.mount();
    dashboard.settle().await;
    render(dashboard);
    println!("{}", REPL_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        match cmd {
            ":quit" | ":q" => break,
            ":help" => println!("{}", REPL_HELP),
            ":show" => render(dashboard),
            ":dismiss" => dashboard.dismiss_suggestions(),
            ":pick" => {
                let picked = index_arg(arg)
                    .and_then(|i| dashboard.controller().suggestions().get(i).cloned());
                match picked {
                    Some(city) => {
                        dashboard.select_city(&city);
                        dashboard.settle().await;
                        render(dashboard);
                    }
                    None => println!("No such suggestion"),
                }
            }
            ":day" => {
                let picked = index_arg(arg)
                    .and_then(|i| dashboard.controller().day_cards().get(i).map(|c| c.day));
                match picked {
                    Some(day) if dashboard.select_day(day) => render_chart(dashboard.controller().hourly_chart()),
                    _ => println!("No such day"),
                }
            }
            _ => {
                dashboard.type_query(line);
                dashboard.settle().await;
                print_suggestions(dashboard.controller().suggestions());
            }
        }
    }

    Ok(())
}

/// 1-based index as typed by the user
fn index_arg(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

fn print_suggestions(suggestions: &[String]) {
    if suggestions.is_empty() {
        println!("(no suggestions)");
        return;
    }
    for (i, name) in suggestions.iter().enumerate() {
        println!("{:>3}. {}", i + 1, name);
    }
}

fn render(dashboard: &Dashboard) {
    let controller = dashboard.controller();
    println!("== {} ==", controller.city());

    let cards = controller.day_cards();
    if cards.is_empty() && controller.is_loading() {
        println!("Chargement des données...");
        return;
    }

    for (i, card) in cards.iter().enumerate() {
        render_card(i + 1, card, controller.selected_day() == Some(card.day));
    }
    render_chart(controller.hourly_chart());
}

fn render_card(index: usize, card: &DayCard, selected: bool) {
    let marker = if selected { '*' } else { ' ' };
    println!(
        "{}{:>2}. {}  Temps: {:.1}°C  Humidité: {}%  Vent: {:.1} m/s  Pression: {:.0} hPa  [{}]",
        marker,
        index,
        card.label,
        card.temperature,
        card.humidity,
        card.wind_speed,
        card.pressure,
        card.icon_url,
    );
}

fn render_chart(chart: Option<HourlyChart>) {
    let Some(chart) = chart else {
        println!("Chargement des données...");
        return;
    };

    println!("\n{}", chart.title);
    let header: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
    println!("{:>6} | {}", "", header.join(" | "));
    for (row, label) in chart.labels.iter().enumerate() {
        let cells: Vec<String> = chart
            .datasets
            .iter()
            .zip(&header)
            .map(|(d, h)| {
                let value = d.data.get(row).copied().unwrap_or_default();
                format!("{:>width$.1}", value, width = h.chars().count())
            })
            .collect();
        println!("{:>6} | {}", label, cells.join(" | "));
    }
}
