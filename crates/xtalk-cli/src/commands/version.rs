//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - crosstalk and dynamical-decoupling benchmark",
        style("xtalk").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  xtalk-ir           Circuit, layout and timing model");
    println!("  xtalk-qasm3        OpenQASM 3 emission");
    println!("  xtalk-hal          Backend abstraction");
    println!("  xtalk-bench        Scenarios, execution and fidelity evaluation");
    println!("  xtalk-adapter-ibm  IBM Quantum backend");
    println!("  xtalk-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/xtalk").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
