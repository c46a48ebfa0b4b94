//! Scenarios command implementation.

use console::style;

use xtalk_bench::ScenarioKind;

/// Execute the scenarios command.
pub fn execute() {
    println!("{}", style("Scenario kinds (canonical order):").bold());
    let mut start = 0;
    for kind in ScenarioKind::ALL {
        let end = start + kind.sweep_len();
        println!(
            "  {:<28} [{start:>3}..{end:>3})  {}",
            style(kind).cyan(),
            kind.description()
        );
        start = end;
    }
    println!("\n  {start} circuits in total with --all");
}
