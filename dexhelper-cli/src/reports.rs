use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use dexhelper_core::{
    CollectionSummary, DexRow, EvolutionNote, ImportReport, LineMember, LocationSpot,
    SpeciesStrategy, StrategyOption,
};

/// Clock state as shown by `clock` and `watch`.
#[derive(Debug, Clone, Serialize)]
pub struct ClockReport {
    pub time: String,
    pub period: String,
    pub season: String,
    pub next_period: String,
    pub next_in_seconds: i64,
    pub countdown: String,
}

/// Outcome of a collection mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: &'static str,
    pub species: Vec<String>,
}

fn json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    let json_output = serde_json::to_string_pretty(value)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

fn percent(probability: f64) -> String {
    format!("{probability:.1}%")
}

pub fn clock(out: &mut impl Write, report: &str, clock: &ClockReport) -> Result<()> {
    match report {
        "json" => json(out, clock),
        "markdown" => {
            writeln!(out, "# Game Clock\n")?;
            writeln!(out, "| Time | Period | Season | Next |")?;
            writeln!(out, "|------|--------|--------|------|")?;
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                clock.time, clock.period, clock.season, clock.countdown
            )?;
            Ok(())
        }
        _ => {
            writeln!(out, "{}", "🕐 Game Clock".bright_cyan().bold())?;
            writeln!(out, "Time:   {}", clock.time.bold())?;
            writeln!(out, "Period: {}", clock.period)?;
            writeln!(out, "Season: {}", clock.season)?;
            writeln!(out, "Next:   {}", clock.countdown.yellow())?;
            Ok(())
        }
    }
}

fn best_option(strategy: Option<&SpeciesStrategy>) -> Option<&StrategyOption> {
    strategy.and_then(|strategy| strategy.cost_ranking.first())
}

fn write_spot_console(out: &mut impl Write, rank: usize, spot: &LocationSpot) -> Result<()> {
    writeln!(
        out,
        "{} {}",
        format!("{rank:>2}.").dimmed(),
        spot.key.to_string().bright_green().bold()
    )?;
    writeln!(
        out,
        "    lines {} · catchable {} · +{} dex",
        spot.distinct_uncaught_lines, spot.catchable_count, spot.total_uncaught_dex_entries
    )?;
    if !spot.uncaught_by_rarity.is_empty() {
        let tiers: Vec<String> = spot
            .uncaught_by_rarity
            .iter()
            .map(|(rarity, count)| format!("{rarity} {count}"))
            .collect();
        let methods: Vec<String> = spot
            .uncaught_by_method
            .iter()
            .map(|tally| format!("{} {}", tally.method, tally.count))
            .collect();
        writeln!(out, "    {} | {}", tiers.join(" · "), methods.join(" · "))?;
    }
    for species in &spot.species {
        let mut line = format!("    • {}", species.name.bold());
        if let Some(rarity) = species.best_rarity {
            line.push_str(&format!(" [{rarity}]"));
        }
        if !species.levels.is_empty() {
            line.push_str(&format!(" Lv {}", species.levels.join(", ")));
        }
        if !species.methods.is_empty() {
            line.push_str(&format!(" {}", species.methods.join("/")));
        }
        if !species.time_exclusivity.is_empty() {
            line.push_str(&format!(" ⏰ {}", species.time_exclusivity.join(", ")));
        }
        line.push_str(&format!(" +{} Dex", species.uncaught_line_count));
        writeln!(out, "{line}")?;
        if let Some(noted) = &species.noted_for {
            writeln!(out, "      {}", format!("kept for {noted}").dimmed())?;
        }
        if let Some(option) = best_option(species.strategy.as_ref()) {
            writeln!(
                out,
                "      cheapest: {} ({}) {} ≈ ₽{:.0}",
                option.device,
                option.condition_label,
                percent(option.probability),
                option.expected_cost
            )?;
        }
        if species.better_spot_elsewhere {
            writeln!(out, "      {}", "a better spot exists elsewhere".yellow())?;
        }
        for note in &species.notes {
            writeln!(out, "      {}", note.to_string().yellow())?;
        }
    }
    Ok(())
}

pub fn spots(out: &mut impl Write, report: &str, spots: &[LocationSpot]) -> Result<()> {
    match report {
        "json" => json(out, spots),
        "markdown" => {
            writeln!(out, "# Best Catching Spots\n")?;
            if spots.is_empty() {
                writeln!(out, "_Nothing left to catch right now._")?;
                return Ok(());
            }
            writeln!(out, "| # | Location | Lines | Catchable | +Dex | Species |")?;
            writeln!(out, "|---|----------|-------|-----------|------|---------|")?;
            for (index, spot) in spots.iter().enumerate() {
                let names: Vec<&str> = spot.species.iter().map(|s| s.name.as_str()).collect();
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    index + 1,
                    spot.key,
                    spot.distinct_uncaught_lines,
                    spot.catchable_count,
                    spot.total_uncaught_dex_entries,
                    names.join(", ")
                )?;
            }
            Ok(())
        }
        _ => {
            writeln!(out, "{}", "📍 Best Catching Spots".bright_cyan().bold())?;
            writeln!(out, "{}", "=====================".cyan())?;
            if spots.is_empty() {
                writeln!(out, "Nothing left to catch right now.")?;
            }
            for (index, spot) in spots.iter().enumerate() {
                write_spot_console(out, index + 1, spot)?;
            }
            Ok(())
        }
    }
}

fn write_ranking_console(
    out: &mut impl Write,
    title: &str,
    ranking: &[StrategyOption],
) -> Result<()> {
    writeln!(out, "  {}", title.bright_yellow())?;
    if ranking.is_empty() {
        writeln!(out, "    (no usable options)")?;
    }
    for option in ranking {
        writeln!(
            out,
            "    {:<12} {:<18} {:>6}  ₽{:>8.0}  turns {}",
            option.device,
            option.condition_label,
            percent(option.probability),
            option.expected_cost,
            option.turns
        )?;
    }
    Ok(())
}

fn write_ranking_markdown(
    out: &mut impl Write,
    title: &str,
    ranking: &[StrategyOption],
) -> Result<()> {
    writeln!(out, "### {title}\n")?;
    writeln!(out, "| Device | Condition | Chance | Expected cost | Turns |")?;
    writeln!(out, "|--------|-----------|--------|---------------|-------|")?;
    for option in ranking {
        writeln!(
            out,
            "| {} | {} | {} | {:.0} | {} |",
            option.device,
            option.condition_label,
            percent(option.probability),
            option.expected_cost,
            option.turns
        )?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn strategies(
    out: &mut impl Write,
    report: &str,
    strategies: &[SpeciesStrategy],
    cheapest_only: bool,
) -> Result<()> {
    match report {
        "json" => json(out, strategies),
        "markdown" => {
            for strategy in strategies {
                writeln!(out, "## {} at {}\n", strategy.species_name, strategy.location)?;
                write_ranking_markdown(out, "Cheapest", &strategy.cost_ranking)?;
                if !cheapest_only {
                    write_ranking_markdown(out, "Fastest", &strategy.speed_ranking)?;
                }
            }
            Ok(())
        }
        _ => {
            if strategies.is_empty() {
                writeln!(out, "No live encounters with complete capture data.")?;
            }
            for strategy in strategies {
                writeln!(
                    out,
                    "{} {}",
                    strategy.species_name.bright_green().bold(),
                    format!("@ {}", strategy.location).dimmed()
                )?;
                write_ranking_console(out, "💰 Cheapest", &strategy.cost_ranking)?;
                if !cheapest_only {
                    write_ranking_console(out, "⚡ Fastest", &strategy.speed_ranking)?;
                }
            }
            Ok(())
        }
    }
}

pub fn line(out: &mut impl Write, report: &str, members: &[LineMember]) -> Result<()> {
    match report {
        "json" => json(out, members),
        "markdown" => {
            writeln!(out, "| Stage | Species | Evolves into |")?;
            writeln!(out, "|-------|---------|--------------|")?;
            for member in members {
                let targets: Vec<String> = member
                    .evolutions
                    .iter()
                    .map(|evo| format!("{} ({})", evo.name, evo.describe()))
                    .collect();
                writeln!(
                    out,
                    "| {} | {} | {} |",
                    member.stage,
                    member.name,
                    targets.join(", ")
                )?;
            }
            Ok(())
        }
        _ => {
            for member in members {
                let indent = "  ".repeat(usize::try_from(member.stage).unwrap_or_default());
                writeln!(out, "{indent}{} #{}", member.name.bold(), member.id)?;
                for evo in &member.evolutions {
                    writeln!(out, "{indent}  → {} ({})", evo.name, evo.describe().dimmed())?;
                }
            }
            Ok(())
        }
    }
}

pub fn dex(out: &mut impl Write, report: &str, rows: &[DexRow]) -> Result<()> {
    match report {
        "json" => json(out, rows),
        "markdown" => {
            writeln!(out, "| # | Species | Caught | Caught at |")?;
            writeln!(out, "|---|---------|--------|-----------|")?;
            for row in rows {
                writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    row.regional_index.unwrap_or(row.id),
                    row.name,
                    if row.caught { "yes" } else { "no" },
                    row.caught_at.map(|at| at.to_rfc3339()).unwrap_or_default()
                )?;
            }
            Ok(())
        }
        _ => {
            for row in rows {
                let mark = if row.caught {
                    "✔".green()
                } else if row.noted_for.is_some() {
                    "~".yellow()
                } else {
                    "·".dimmed()
                };
                writeln!(
                    out,
                    "{mark} {:>4} {}",
                    row.regional_index.unwrap_or(row.id),
                    row.name
                )?;
            }
            writeln!(out, "{} species", rows.len())?;
            Ok(())
        }
    }
}

pub fn notes(out: &mut impl Write, report: &str, notes: &[EvolutionNote]) -> Result<()> {
    match report {
        "json" => json(out, notes),
        _ => {
            if notes.is_empty() {
                writeln!(out, "No advisories for this line.")?;
            }
            for note in notes {
                writeln!(out, "{note}")?;
            }
            Ok(())
        }
    }
}

pub fn action(out: &mut impl Write, report: &str, action: &ActionReport) -> Result<()> {
    match report {
        "json" => json(out, action),
        _ => {
            if action.species.is_empty() {
                writeln!(out, "{}: nothing changed", action.action)?;
            } else {
                writeln!(out, "✅ {}: {}", action.action, action.species.join(", "))?;
            }
            Ok(())
        }
    }
}

pub fn imported(out: &mut impl Write, report: &str, outcome: ImportReport) -> Result<()> {
    match report {
        "json" => json(out, &outcome),
        _ => {
            writeln!(
                out,
                "📥 imported {} entries ({} skipped)",
                outcome.applied, outcome.skipped
            )?;
            Ok(())
        }
    }
}

pub fn summary(out: &mut impl Write, report: &str, summary: &CollectionSummary) -> Result<()> {
    match report {
        "json" => json(out, summary),
        _ => {
            writeln!(out, "Caught {}/{}", summary.caught, summary.total)?;
            if let (Some(first), Some(days)) = (&summary.first_catch, summary.journey_days) {
                writeln!(out, "Journey started with {first}, {days} days ago")?;
            }
            Ok(())
        }
    }
}

pub fn profiles(out: &mut impl Write, report: &str, active: &str, names: &[String]) -> Result<()> {
    match report {
        "json" => json(
            out,
            &serde_json::json!({ "active": active, "profiles": names }),
        ),
        _ => {
            for name in names {
                let marker = if name == active { "*" } else { " " };
                writeln!(out, "{marker} {name}")?;
            }
            Ok(())
        }
    }
}
