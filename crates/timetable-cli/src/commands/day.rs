//! Day and week views.

use clap::Subcommand;
use serde::Serialize;
use std::collections::HashMap;
use timetable_core::time::to_time;
use timetable_core::{free_gaps, Matter, TimeBlock, TimetableStore, Weekday};

use super::{open_service, print_json};

#[derive(Subcommand)]
pub enum DayAction {
    /// Show one day's blocks
    Show {
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show free stretches of a day
    Gaps {
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        /// Shortest gap to report, in minutes
        #[arg(long, default_value = "0")]
        min: i32,
    },
}

#[derive(Subcommand)]
pub enum WeekAction {
    /// Show the visible days of a kid's week
    Show {
        #[arg(long)]
        kid: String,
        /// Include hidden weekdays
        #[arg(long)]
        all: bool,
    },
}

/// One column of the week view; columns keep the configured day order.
#[derive(Serialize)]
struct WeekColumn<'a> {
    day: Weekday,
    blocks: &'a [TimeBlock],
}

#[derive(Serialize)]
struct BlockRow<'a> {
    #[serde(flatten)]
    block: &'a TimeBlock,
    matter_name: Option<&'a str>,
}

fn rows<'a>(blocks: &'a [TimeBlock], matters: &'a HashMap<String, Matter>) -> Vec<BlockRow<'a>> {
    blocks
        .iter()
        .map(|block| BlockRow {
            block,
            matter_name: matters.get(&block.matter_id).map(|m| m.name.as_str()),
        })
        .collect()
}

fn print_table(day: Weekday, blocks: &[BlockRow]) {
    println!("{day}");
    if blocks.is_empty() {
        println!("  (no blocks)");
    }
    for row in blocks {
        let start = to_time(row.block.start_min).unwrap_or_default();
        let end = to_time(row.block.end_min).unwrap_or_default();
        let name = row.matter_name.unwrap_or(&row.block.matter_id);
        println!("  {start}-{end}  {name}  [{}]", row.block.id);
    }
}

pub fn run_day(action: DayAction) -> Result<(), Box<dyn std::error::Error>> {
    let (config, service) = open_service()?;

    match action {
        DayAction::Show { kid, day, json } => {
            let blocks = service.store().day_schedule(&kid, day)?;
            let matters: HashMap<String, Matter> = service
                .store()
                .list_matters()?
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect();
            let rows = rows(&blocks, &matters);
            if json {
                print_json(&rows)?;
            } else {
                print_table(day, &rows);
            }
        }
        DayAction::Gaps { kid, day, min } => {
            let blocks = service.store().day_schedule(&kid, day)?;
            let gaps = free_gaps(&blocks, &config.scheduler, min);
            let labels: Vec<String> = gaps.iter().map(ToString::to_string).collect();
            print_json(&labels)?;
        }
    }
    Ok(())
}

pub fn run_week(action: WeekAction) -> Result<(), Box<dyn std::error::Error>> {
    let (config, service) = open_service()?;

    match action {
        WeekAction::Show { kid, all } => {
            let timetable = service.store().timetable(&kid)?;
            let days = if all {
                Weekday::week_from(config.view.week_start)
            } else {
                config.visible_days()
            };
            let week: Vec<WeekColumn> = days
                .into_iter()
                .map(|day| WeekColumn {
                    day,
                    blocks: timetable.day(day),
                })
                .collect();
            print_json(&week)?;
        }
    }
    Ok(())
}
