use std::time::Duration;

use crate::compare::{ComparisonRow, PairReport};

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Print a single comparison result line.
pub fn print_pair_line(report: &PairReport) {
    match report {
        PairReport::Row(row) => print_row_line(row),
        PairReport::Failed(f) => {
            println!("  \x1b[31m ERR\x1b[0m  {}  ({})", f.source_screen, f.error);
        }
    }
}

fn print_row_line(row: &ComparisonRow) {
    if row.is_sentinel() {
        println!(
            "  \x1b[33mMISS\x1b[0m  {}  (no counterpart in target set)",
            row.source_screen
        );
    } else if row.difference == 0.0 {
        println!("  \x1b[32mSAME\x1b[0m  {}", row.source_screen);
    } else {
        let pct = row.difference * 100.0;
        println!(
            "  \x1b[31mDIFF\x1b[0m  {}  ({pct:.2}% of pixels)",
            row.source_screen
        );
    }
}

/// Print the final batch summary.
pub fn print_summary(
    total: usize,
    same: usize,
    differing: usize,
    missing: usize,
    errored: usize,
    elapsed: Duration,
) {
    println!();
    print!(
        "Screens:  {total} total, \x1b[32m{same} same\x1b[0m, \x1b[31m{differing} differing\x1b[0m, \x1b[33m{missing} missing\x1b[0m"
    );
    if errored > 0 {
        print!(", \x1b[31m{errored} errored\x1b[0m");
    }
    println!();
    println!("Time:     {}", format_duration(elapsed));

    if missing > 0 || errored > 0 {
        println!();
        if missing > 0 {
            println!("{missing} screen(s) have no counterpart in the target set.");
        }
        if errored > 0 {
            println!("{errored} screen(s) could not be compared.");
        }
    }
}
