//! Output boundary between the engine and whatever displays the game.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::data::{Location, Narrative};
use crate::state::{CombatPhase, PlayerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A choice as the player sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub text: String,
    pub enabled: bool,
}

/// Snapshot of a running fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatFrame {
    pub enemy_name: String,
    pub enemy_health: i32,
    pub enemy_max_health: i32,
    pub player_health: i32,
    pub player_max_health: i32,
    pub player_psi: i32,
    pub phase: CombatPhase,
    pub round: u32,
    pub last_entry: Option<String>,
}

impl CombatFrame {
    /// Frame for the fight in `state`, if any.
    #[must_use]
    pub fn capture(state: &PlayerState) -> Option<Self> {
        let enemy = state.combat.enemy.as_ref()?;
        Some(Self {
            enemy_name: enemy.name.clone(),
            enemy_health: enemy.health,
            enemy_max_health: enemy.max_health,
            player_health: state.stats.health,
            player_max_health: state.stats.max_health,
            player_psi: state.stats.psi,
            phase: state.combat.phase,
            round: state.combat.round,
            last_entry: state.combat.log.last().cloned(),
        })
    }
}

pub trait Presenter {
    fn render_location(&mut self, location: &Location);

    fn render_narrative(&mut self, narrative: &Narrative);

    fn render_choices(&mut self, choices: &[ChoiceView]);

    fn render_combat_frame(&mut self, frame: &CombatFrame);

    fn show_message(&mut self, text: &str, severity: Severity, duration_ms: u32);

    /// Ask the player to pick one option. `None` means the prompt was canceled.
    fn prompt_selection(&mut self, prompt: &str, options: &[String]) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Location(String),
    Narrative(String),
    Choices(Vec<ChoiceView>),
    Combat(CombatFrame),
    Message {
        text: String,
        severity: Severity,
        duration_ms: u32,
    },
    Prompt {
        prompt: String,
        options: Vec<String>,
    },
}

/// Presenter that records everything and answers prompts from a queue.
///
/// An empty answer queue cancels every prompt.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub events: Vec<PresenterEvent>,
    answers: VecDeque<Option<usize>>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_answers(answers: &[Option<usize>]) -> Self {
        Self {
            events: Vec::new(),
            answers: answers.iter().copied().collect(),
        }
    }

    pub fn queue_answer(&mut self, answer: Option<usize>) {
        self.answers.push_back(answer);
    }

    pub fn messages(&self) -> impl Iterator<Item = (&str, Severity)> {
        self.events.iter().filter_map(|event| match event {
            PresenterEvent::Message { text, severity, .. } => Some((text.as_str(), *severity)),
            _ => None,
        })
    }

    #[must_use]
    pub fn has_message(&self, needle: &str) -> bool {
        self.messages().any(|(text, _)| text.contains(needle))
    }

    #[must_use]
    pub fn last_choices(&self) -> Option<&[ChoiceView]> {
        self.events.iter().rev().find_map(|event| match event {
            PresenterEvent::Choices(choices) => Some(choices.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn prompts(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, PresenterEvent::Prompt { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Presenter for RecordingPresenter {
    fn render_location(&mut self, location: &Location) {
        self.events
            .push(PresenterEvent::Location(location.id.clone()));
    }

    fn render_narrative(&mut self, narrative: &Narrative) {
        self.events
            .push(PresenterEvent::Narrative(narrative.id.clone()));
    }

    fn render_choices(&mut self, choices: &[ChoiceView]) {
        self.events.push(PresenterEvent::Choices(choices.to_vec()));
    }

    fn render_combat_frame(&mut self, frame: &CombatFrame) {
        self.events.push(PresenterEvent::Combat(frame.clone()));
    }

    fn show_message(&mut self, text: &str, severity: Severity, duration_ms: u32) {
        self.events.push(PresenterEvent::Message {
            text: text.to_string(),
            severity,
            duration_ms,
        });
    }

    fn prompt_selection(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        self.events.push(PresenterEvent::Prompt {
            prompt: prompt.to_string(),
            options: options.to_vec(),
        });
        self.answers
            .pop_front()
            .flatten()
            .filter(|index| *index < options.len())
    }
}
