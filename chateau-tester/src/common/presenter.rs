use chateau_game::{ChoiceView, CombatFrame, Location, Narrative, Presenter, Severity};
use colored::Colorize;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Share of prompts answered with a cancel.
const CANCEL_RATE: f64 = 0.2;

/// Headless presenter for automated runs: prints the scene when verbose and
/// answers prompts with seeded picks.
#[derive(Debug, Clone)]
pub struct ConsolePresenter {
    verbose: bool,
    rng: ChaCha20Rng,
    pub messages: usize,
    pub prompts: usize,
}

impl ConsolePresenter {
    pub fn new(seed: u64, verbose: bool) -> Self {
        Self {
            verbose,
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x5EED_CAFE),
            messages: 0,
            prompts: 0,
        }
    }
}

impl Presenter for ConsolePresenter {
    fn render_location(&mut self, location: &Location) {
        if self.verbose {
            println!("    📍 {}", location.title.bright_white().bold());
        }
    }

    fn render_narrative(&mut self, narrative: &Narrative) {
        if self.verbose {
            println!("    📜 {}", narrative.id.white());
        }
    }

    fn render_choices(&mut self, choices: &[ChoiceView]) {
        if !self.verbose {
            return;
        }
        for (index, choice) in choices.iter().enumerate() {
            if choice.enabled {
                println!("       {index}. {}", choice.text);
            } else {
                println!("       {index}. {}", choice.text.dimmed());
            }
        }
    }

    fn render_combat_frame(&mut self, frame: &CombatFrame) {
        if self.verbose {
            println!(
                "    ⚔️  {} {}/{} vs PV {}/{} PSI {} (round {})",
                frame.enemy_name.red(),
                frame.enemy_health,
                frame.enemy_max_health,
                frame.player_health,
                frame.player_max_health,
                frame.player_psi,
                frame.round
            );
        }
    }

    fn show_message(&mut self, text: &str, severity: Severity, _duration_ms: u32) {
        self.messages += 1;
        if !self.verbose {
            return;
        }
        let line = match severity {
            Severity::Info => text.normal(),
            Severity::Success => text.green(),
            Severity::Warning => text.yellow(),
            Severity::Error => text.red(),
        };
        println!("    💬 {line}");
    }

    fn prompt_selection(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        self.prompts += 1;
        if options.is_empty() || self.rng.gen_bool(CANCEL_RATE) {
            return None;
        }
        let pick = self.rng.gen_range(0..options.len());
        if self.verbose {
            println!("    ❓ {prompt} → {}", options[pick].cyan());
        }
        Some(pick)
    }
}
