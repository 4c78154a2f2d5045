//! The four pipeline stages.
//!
//! Every stage reports through an [`Emitter`](crate::events::Emitter) and
//! never returns an error: tool failures are caught at the stage boundary
//! and turned into issue strings (executor) or `error` events.

pub mod executor;
pub mod scenario_simulator;
pub mod skill_generator;
pub mod validator;

pub use executor::{ExecutorConfig, ExecutorStage};
pub use scenario_simulator::ScenarioSimulatorStage;
pub use skill_generator::{expand_queries, SkillGeneratorStage};
pub use validator::{check_skill, validate, ValidatorStage};

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("视频教程", 2), "视频");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
