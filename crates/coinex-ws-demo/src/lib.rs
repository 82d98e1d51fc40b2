/*
[INPUT]:  Public API exports for coinex-ws-demo crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod console;
pub mod scenarios;

// Re-export main types for convenience
pub use self::config::DemoConfig;
pub use console::{ConsoleHandler, ConsoleStats};
pub use scenarios::{Scenario, ScenarioReport, StopReason, run_scenario, run_scenario_with};
