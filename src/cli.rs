// src/cli.rs
use crate::analysis::comparator::{ChangeKind, RiskPair};
use crate::analysis::narrative::{truncate_chars, NarrativeOutcome};
use crate::analysis::ComparisonReport;
use crate::edgar::models::FilingMetadata;
use crate::utils::error::AppError;
use dialoguer::{theme::ColorfulTheme, Input};

pub fn prompt_ticker() -> Result<String, AppError> {
    let ticker: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter ticker to analyze")
        .validate_with(|input: &String| {
            let input = input.trim();
            if !input.is_empty() && input.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
                Ok(())
            } else {
                Err("Enter a ticker symbol such as AAPL")
            }
        })
        .interact_text()?;
    Ok(ticker.trim().to_uppercase())
}

/// Parses "1 2" into two distinct 0-based indices below `count`.
pub fn parse_selection(input: &str, count: usize) -> Option<(usize, usize)> {
    let mut parts = input.split(|c: char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty());
    let first: usize = parts.next()?.parse().ok()?;
    let second: usize = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let valid = |i: usize| (1..=count).contains(&i);
    if !valid(first) || !valid(second) || first == second {
        return None;
    }
    Some((first - 1, second - 1))
}

/// Lists the filings and asks for two of them until the answer is valid.
pub fn prompt_filing_pair(filings: &[FilingMetadata]) -> Result<(usize, usize), AppError> {
    println!("\nAvailable 10-K filings for comparison:");
    for (i, filing) in filings.iter().enumerate() {
        let year = filing
            .year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "????".to_string());
        println!("{}. {} (filed {})", i + 1, year, filing.filing_date);
    }

    let theme = ColorfulTheme::default();
    loop {
        let answer: String = Input::with_theme(&theme)
            .with_prompt("Select two filings to compare (e.g. '1 2')")
            .interact_text()?;
        match parse_selection(&answer, filings.len()) {
            Some(selection) => return Ok(selection),
            None => println!("Invalid input. Please enter two different numbers between 1 and {}.", filings.len()),
        }
    }
}

pub fn print_report(report: &ComparisonReport) {
    let stats = &report.content.statistics;
    let summary = &report.content.summary;

    println!("\n=== Risk Factor Comparison: {} ===", report.ticker);
    println!(
        "Current filing:  {} ({} risks, {} words, {:.1} avg words/risk)",
        report.current_filing.filing_date,
        stats.current_year.total_risks,
        stats.current_year.total_words,
        stats.current_year.avg_words_per_risk
    );
    println!(
        "Previous filing: {} ({} risks, {} words, {:.1} avg words/risk)",
        report.previous_filing.filing_date,
        stats.previous_year.total_risks,
        stats.previous_year.total_words,
        stats.previous_year.avg_words_per_risk
    );
    println!(
        "Change: {:+} risks, {:+} words, overall similarity {:.2}",
        stats.total_risks_change, stats.word_count_change, stats.overall_similarity
    );
    println!(
        "\nAdded: {}  Removed: {}  Modified: {}  Unchanged: {}",
        summary.added, summary.removed, summary.modified, summary.unchanged
    );

    print_pairs("Added risks", &report.content.pairs, ChangeKind::Added);
    print_pairs("Removed risks", &report.content.pairs, ChangeKind::Removed);
    print_pairs("Modified risks", &report.content.pairs, ChangeKind::Modified);

    println!("\n{}", "=".repeat(80));
    match &report.narrative {
        NarrativeOutcome::Completed(analysis) => {
            let overall = &analysis.overall_assessment;
            println!("Overall Risk Trend: {:?}", overall.risk_trend);
            println!("Confidence: {:?}", overall.confidence);
            println!("\nSummary: {}", overall.summary);

            print_list("Major Changes", &analysis.key_findings.major_changes);
            print_list("Emerging Risks", &analysis.key_findings.emerging_risks);
            print_list("Reduced Risks", &analysis.key_findings.reduced_risks);
            print_list("Persistent Concerns", &analysis.key_findings.persistent_concerns);

            println!("\nDetailed Risk Changes:");
            for change in &analysis.risk_changes {
                println!("\nRisk Area: {}", change.risk_area);
                println!("Change Type: {:?}", change.change_type);
                println!("Severity Change: {:?}", change.severity_change);
                println!("Significance: {:?}", change.significance);
                println!("Description: {}", change.description);
                println!("Implications: {}", change.implications);
            }
        }
        NarrativeOutcome::Failed { reason } => {
            println!("Narrative analysis unavailable: {}", reason);
            println!("(Statistics above are complete.)");
        }
    }
}

fn print_pairs(title: &str, pairs: &[RiskPair], kind: ChangeKind) {
    let selected: Vec<&RiskPair> = pairs.iter().filter(|p| p.kind == kind).collect();
    if selected.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, selected.len());
    for pair in selected {
        let entry = pair.current.as_ref().or(pair.previous.as_ref());
        let summary = entry.map(|e| e.summary.as_str()).unwrap_or_default();
        match kind {
            ChangeKind::Modified => println!(
                "- [{:.2}, {:+} words] {}",
                pair.similarity,
                pair.word_count_change,
                shorten(summary, 160)
            ),
            _ => println!("- {}", shorten(summary, 160)),
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    println!("\n{}:", title);
    if items.is_empty() {
        println!("- (none)");
    }
    for item in items {
        println!("- {}", item);
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
