use std::env;
use std::fs;
use std::path::Path;
use std::process;

use chrono::NaiveTime;

use shiftgrid::daytime::{day_title, parse_time_cell};
use shiftgrid::{ChangeRequest, Config, CsvStore, Engine, ShiftRequest, Slot};

const USAGE: &str = "\
usage: shiftgrid <data-dir> <command> [...]

commands:
  add    <person> <tab> <day> <start> <end>
  remove <person> <tab> <day> <start> <end>
  change <person> <tab> <day> <start> <end> <new-tab> <new-day> <new-start> <new-end>
  hours  <person>

<tab> is a campus alias (MC, UNH, on-call) or a full tab title.
Times accept 12- or 24-hour clock: '2pm', '2:30 PM', '14:00'.
Config overrides are read from <data-dir>/shiftgrid.json when present.";

/// "2pm", "2:30 PM" or "14:00".
fn parse_flex_time(s: &str) -> Option<NaiveTime> {
    let t = s.trim();
    if let Some(parsed) = parse_time_cell(t) {
        return Some(parsed);
    }
    let squeezed = t.to_uppercase();
    if let Some(head) = squeezed.strip_suffix("AM").or_else(|| squeezed.strip_suffix("PM")) {
        if !head.contains(':') {
            let rebuilt = format!("{}:00 {}", head.trim(), &squeezed[squeezed.len() - 2..]);
            if let Some(parsed) = parse_time_cell(&rebuilt) {
                return Some(parsed);
            }
        }
    }
    NaiveTime::parse_from_str(t, "%H:%M").ok()
}

fn load_config(dir: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let path = dir.join("shiftgrid.json");
    if path.exists() {
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(Config::default())
    }
}

fn slot(args: &[String]) -> Result<Slot, Box<dyn std::error::Error>> {
    let start = parse_flex_time(&args[3]).ok_or(format!("cannot read time '{}'", args[3]))?;
    let end = parse_flex_time(&args[4]).ok_or(format!("cannot read time '{}'", args[4]))?;
    Ok(Slot {
        target: args[1].clone(),
        day: args[2].clone(),
        start,
        end,
    })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        return Err(USAGE.into());
    }
    let dir = Path::new(&args[0]);
    let cfg = load_config(dir)?;
    let store = CsvStore::open(dir)?;
    let mut engine = Engine::new(store, cfg);

    let command = args[1].as_str();
    let rest = &args[2..];
    match command {
        "add" if rest.len() == 5 => {
            let summary = engine.add(&ShiftRequest {
                person: rest[0].clone(),
                slot: slot(rest)?,
            })?;
            println!(
                "Added {} on {} ({} {}). Weekly total: {:.1}h.",
                summary.person,
                summary.tab,
                day_title(summary.day),
                summary.window_label,
                summary.weekly_hours
            );
        }
        "remove" if rest.len() == 5 => {
            let summary = engine.remove(&ShiftRequest {
                person: rest[0].clone(),
                slot: slot(rest)?,
            })?;
            println!(
                "Removed {} from {} ({} {}). Weekly total: {:.1}h.",
                summary.person,
                summary.tab,
                day_title(summary.day),
                summary.window_label,
                summary.weekly_hours
            );
        }
        "change" if rest.len() == 9 => {
            let summary = engine.change(&ChangeRequest {
                person: rest[0].clone(),
                old: slot(&rest[..5])?,
                new: slot(&[rest[0].clone(), rest[5].clone(), rest[6].clone(), rest[7].clone(), rest[8].clone()])?,
            })?;
            println!(
                "Moved {} to {} ({} {}). Weekly total: {:.1}h.",
                summary.person,
                summary.tab,
                day_title(summary.day),
                summary.window_label,
                summary.weekly_hours
            );
        }
        "hours" if rest.len() == 1 => {
            let hours = engine.display_hours(&rest[0])?;
            println!("{} has {hours:.1}h this week.", rest[0]);
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    if let Err(e) = run() {
        eprintln!("{e}");
        process::exit(1);
    }
}
