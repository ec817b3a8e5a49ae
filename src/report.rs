//! Printable markdown rendering of the at-risk overview, for the weekly
//! mentors meeting handout.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::cohort::{admin_overview, AdminOverview};
use crate::model::{Snapshot, YearLevel};

/// Renders the program-wide at-risk picture as a markdown document.
pub fn at_risk_markdown(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    render(&admin_overview(snapshot, now), now)
}

fn year_label(level: Option<YearLevel>) -> &'static str {
    match level {
        Some(YearLevel::Year1) => "Year 1",
        Some(YearLevel::Year2) => "Year 2",
        None => "unenrolled",
    }
}

fn render(overview: &AdminOverview, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# At-Risk Summary ({})", now.date_naive());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Cohort of {} active students: {} on track, {} at risk.",
        overview.cohort_size,
        overview.on_track.len(),
        overview.at_risk.len(),
    );
    if let Some(rate) = overview.attendance.percentage {
        let _ = writeln!(out, "Program attendance rate: {:.2}%.", rate);
    }
    if let Some(average) = overview.exams.overall_average {
        let _ = writeln!(out, "Program exam average: {:.2}%.", average);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## At risk");
    let _ = writeln!(out);
    if overview.at_risk.is_empty() {
        let _ = writeln!(out, "Nobody is currently at risk.");
    } else {
        for student in &overview.at_risk {
            let _ = writeln!(
                out,
                "- {} ({}): {}",
                student.student_id,
                year_label(student.year_level),
                student.issues.join("; "),
            );
        }
    }

    if overview.missing_exams.total_missing > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Missing exams");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Students with at least one missing exam: {}",
            overview.missing_exams.students_with_missing,
        );
        let _ = writeln!(
            out,
            "Past-due exams without a score: {}",
            overview.missing_exams.total_missing,
        );
    }

    out
}
