pub mod checks;
pub mod reports;
pub mod scenarios;
pub mod tester;

pub use scenarios::{ScenarioEnv, TestScenario, all_scenario_names, get_scenario, list_scenarios};
pub use tester::*;
