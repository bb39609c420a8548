use std::fs::File;
use std::io::Write;

use crate::schedule::{PlacementReport, PlacementType, Recommendation};

/// One-line label used in listings, e.g. "Monday 15:00 - 15:45 (Pairs A)"
pub fn format_recommendation_slot(rec: &Recommendation) -> String {
    format!("{} {} ({})", rec.day, rec.time_slot, rec.group_name)
}

fn type_marker(placement_type: PlacementType) -> &'static str {
    match placement_type {
        PlacementType::Direct => "DIRECT",
        PlacementType::SingleDisplacement => "SWAP",
        PlacementType::ChainDisplacement => "CHAIN",
    }
}

/// Writes a report to a file, one recommendation per line
pub fn write_report_to_file(
    student_name: &str,
    report: &PlacementReport,
    filename: &str,
) -> std::io::Result<()> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Placements for {} **", student_name)?;
    for (rank, rec) in report.recommendations.iter().enumerate() {
        writeln!(
            file,
            "{}. [{}] {} score {} ({}%) - {}",
            rank + 1,
            type_marker(rec.placement_type),
            format_recommendation_slot(rec),
            rec.score,
            rec.percentage,
            rec.explanation
        )?;
    }
    if report.truncated {
        writeln!(file, "[TRUNCATED]")?;
    }

    Ok(())
}

/// Prints a report in a readable format
pub fn print_report(student_name: &str, report: &PlacementReport) {
    println!("\n=== Placements for {} ===", student_name);
    println!(
        "Total recommendations: {} ({} direct, {} single displacement, {} chain)",
        report.summary.total,
        report.summary.direct_count,
        report.summary.single_displacement_count,
        report.summary.chain_displacement_count
    );
    if report.truncated {
        println!("⚠️  Search ran out of time; displacement options may be missing");
    }

    for (rank, rec) in report.recommendations.iter().enumerate() {
        println!(
            "\n  {}. [{}] {} with {} -> score {} ({}%), feasibility {}",
            rank + 1,
            type_marker(rec.placement_type),
            format_recommendation_slot(rec),
            rec.coach,
            rec.score,
            rec.percentage,
            rec.feasibility_score
        );
        println!("     {}/{} students", rec.current_size, rec.max_capacity);
        println!("     {}", rec.explanation);
        for displaced in &rec.displaced_students {
            println!(
                "     - moves {} ({}): {} {} ({})",
                displaced.name,
                displaced.enrollment_type.label(),
                displaced.to_day,
                displaced.to_time_slot,
                displaced.to_group_name
            );
        }
    }
}
