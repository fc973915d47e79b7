//! Output formatters for update reports and extracted records

use anyhow::Result;
use colored::*;
use sheettrack_core::ExtractedData;
use sheettrack_core::orchestrator::{TeacherStatus, UpdateReport, WorksheetStatus};

/// Print an update report in human-readable format with colors and hierarchy
pub fn print_update_human(report: &UpdateReport) {
    println!(
        "{}",
        format!("Academic year: {}", report.academic_year).bold()
    );
    println!();

    if report.teachers.is_empty() {
        println!("{}", "No active teachers configured".yellow());
        return;
    }

    for teacher in &report.teachers {
        let status = match teacher.status {
            TeacherStatus::Processed => "OK".green().bold(),
            TeacherStatus::NoValidWorksheets => "EMPTY".yellow().bold(),
            TeacherStatus::Failed => "FAILED".red().bold(),
        };
        println!("{} {} [{}]", "Teacher:".bold(), teacher.teacher.cyan().bold(), status);

        if let Some(error) = &teacher.error {
            println!("  {}", error.red());
        }
        if teacher.status == TeacherStatus::NoValidWorksheets {
            println!("  {}", "No valid worksheets found".bright_black());
        }

        for worksheet in &teacher.worksheets {
            print!("  {} {}", "Worksheet:".bold(), worksheet.title.yellow());
            match worksheet.status {
                WorksheetStatus::Updated => {
                    let counts = worksheet.counts;
                    println!(
                        " progress {}/{} topics {}/{} {}",
                        counts.progress_created,
                        counts.progress_updated,
                        counts.topics_created,
                        counts.topics_updated,
                        "(created/updated)".bright_black()
                    );
                }
                WorksheetStatus::NoData => println!(" {}", "no data extracted".bright_black()),
                WorksheetStatus::Failed => println!(
                    " {}",
                    worksheet.error.as_deref().unwrap_or("failed").red()
                ),
            }
            for lookup_error in &worksheet.lookup_errors {
                println!("    {} {}", "SKIP".yellow().bold(), lookup_error);
            }
        }
        println!();
    }

    let counts = report.counts();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Teachers:".bold(), report.teachers.len());
    println!(
        "  {} {} created, {} updated",
        "Progress:".bold(),
        counts.progress_created,
        counts.progress_updated
    );
    println!(
        "  {} {} created, {} updated",
        "Topics:".bold(),
        counts.topics_created,
        counts.topics_updated
    );
    let lookup_errors = report.lookup_errors();
    if lookup_errors > 0 {
        println!("  {} {}", "Skipped records:".yellow().bold(), lookup_errors);
    }
    let failed = report.failed_teachers();
    if failed > 0 {
        println!("  {} {}", "Failed teachers:".red().bold(), failed);
    }
}

/// Print an update report in JSON format
pub fn print_update_json(report: &UpdateReport) -> Result<()> {
    let counts = report.counts();
    let output = serde_json::json!({
        "academic_year": report.academic_year,
        "teachers": report.teachers,
        "summary": {
            "teachers": report.teachers.len(),
            "failed_teachers": report.failed_teachers(),
            "records_written": counts.total(),
            "lookup_errors": report.lookup_errors(),
            "counts": counts,
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_worksheets_human(teacher: &str, worksheets: &[String]) {
    println!("{} {}", "Teacher:".bold(), teacher.cyan().bold());
    if worksheets.is_empty() {
        println!("  {}", "No valid worksheets found".yellow());
        return;
    }
    for title in worksheets {
        println!("  {} {}", "✓".green().bold(), title);
    }
}

pub fn print_worksheets_json(teacher: &str, url: &str, worksheets: &[String]) -> Result<()> {
    let output = serde_json::json!({
        "teacher": teacher,
        "url": url,
        "worksheets": worksheets,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_extracted_human(sheet: &str, data: &ExtractedData) {
    println!("{} {}", "Worksheet:".bold(), sheet.cyan().bold());
    println!();

    if data.is_empty() {
        println!("{}", "No data extracted".yellow());
        return;
    }

    if !data.period_progress.is_empty() {
        println!("{}", "Period progress:".bold().underline());
        for record in &data.period_progress {
            println!(
                "  {} {} {} {:.2}%",
                format!("P{}", record.periodo).yellow(),
                record.paralelo.to_string().cyan(),
                "progress".bright_black(),
                record.progress_percentage
            );
        }
        println!();
    }

    if !data.topic_completion.is_empty() {
        println!("{}", "Topic completion:".bold().underline());
        for record in &data.topic_completion {
            println!(
                "  {} {} [{}] {} {}",
                format!("P{}", record.periodo).yellow(),
                record.paralelo.to_string().cyan(),
                record.tema_number.bright_black(),
                record.tema_title,
                record.completion_date.format("%Y-%m-%d").to_string().green()
            );
        }
    }
}

pub fn print_extracted_json(sheet: &str, data: &ExtractedData) -> Result<()> {
    let output = serde_json::json!({
        "worksheet": sheet,
        "period_progress": data.period_progress,
        "topic_completion": data.topic_completion,
        "summary": {
            "period_progress": data.period_progress.len(),
            "topic_completion": data.topic_completion.len(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
