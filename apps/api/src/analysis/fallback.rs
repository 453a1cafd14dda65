//! Deterministic fallback values for every Analysis Adapter operation.
//!
//! The resilience contract of the assessment flow: no operation that produces
//! an analysis or a question may propagate adapter failure to the caller. The
//! orchestrator substitutes these fixed values instead, so the interview
//! always progresses — degraded in quality, never in availability.

use chrono::{DateTime, Utc};

use crate::models::session::{CvAnalysis, QUESTION_CAP};

/// Opening question used when the first-question call fails.
pub const OPENING_QUESTION: &str = "I'd like to understand your career journey better. \
    What are your current professional goals, and what motivates you in your work?";

/// Fixed ordered follow-up questions, used in sequence when followup
/// generation fails. Must stay at `QUESTION_CAP` entries so the index clamp
/// and the completion check agree.
pub const FALLBACK_QUESTIONS: [&str; QUESTION_CAP] = [
    "What challenges have you faced in your career, and how did you overcome them?",
    "Which skills or areas would you like to develop further?",
    "Describe a project or accomplishment you are particularly proud of.",
    "What motivates you most in your professional work?",
    "Where do you see your career heading over the next few years?",
    "How do you handle working under pressure or against tight deadlines?",
    "What leadership experience do you have, and what did you learn from it?",
    "What do you consider your greatest professional strength and weakness?",
];

/// Neutral analysis used when the analyze call fails.
pub fn default_analysis() -> CvAnalysis {
    CvAnalysis {
        summary: "Professional with diverse experience and skills".to_string(),
        key_skills: vec![
            "Communication".to_string(),
            "Problem Solving".to_string(),
            "Teamwork".to_string(),
            "Leadership".to_string(),
        ],
        experience_years: 5,
        career_stage: "Mid-level Professional".to_string(),
        notable_achievements: vec![
            "Professional development".to_string(),
            "Project completion".to_string(),
        ],
        potential_areas_for_growth: vec![
            "Technical skills".to_string(),
            "Leadership development".to_string(),
        ],
    }
}

/// Follow-up question for a history of length `answered` (post-append).
///
/// The clamp to the last slot guarantees in-bounds access for any count, even
/// if the adapter fails on every single call.
pub fn followup_question(answered: usize) -> &'static str {
    FALLBACK_QUESTIONS[answered.min(FALLBACK_QUESTIONS.len() - 1)]
}

/// Templated narrative summary used when the final-summary call fails.
/// Uses the same lightweight markup the LLM is instructed to emit, so the
/// report renderer exercises one code path for both.
pub fn final_summary(answered: usize, generated_at: DateTime<Utc>) -> String {
    format!(
        "## Professional Assessment Summary\n\
         \n\
         This assessment was conducted with {answered} interview questions based on an \
         analysis of the candidate's CV.\n\
         \n\
         ### Key Observations\n\
         * **Communication**: clear and articulate responses throughout the interview\n\
         * **Professional experience**: answers showed a solid understanding of career \
         progression and its challenges\n\
         * **Forward orientation**: the candidate reflected thoughtfully on professional \
         development\n\
         \n\
         ### Overall Assessment\n\
         The candidate provided thoughtful, complete answers to every question, \
         demonstrating strong communication skills and professional awareness. Based on \
         the interview, the candidate shows good potential for continued growth.\n\
         \n\
         Assessment completed on {}",
        generated_at.format("%d %B %Y at %H:%M UTC")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_list_length_matches_question_cap() {
        assert_eq!(FALLBACK_QUESTIONS.len(), QUESTION_CAP);
    }

    #[test]
    fn test_followup_selection_is_deterministic_and_clamped() {
        // With an adapter failing on every call, answers n = 1..cap-1 walk the
        // list in order; any further index clamps to the final slot.
        for answered in 1..QUESTION_CAP {
            assert_eq!(followup_question(answered), FALLBACK_QUESTIONS[answered]);
        }
        assert_eq!(
            followup_question(QUESTION_CAP),
            FALLBACK_QUESTIONS[QUESTION_CAP - 1]
        );
        assert_eq!(
            followup_question(QUESTION_CAP * 10),
            FALLBACK_QUESTIONS[QUESTION_CAP - 1]
        );
    }

    #[test]
    fn test_default_analysis_is_populated() {
        let a = default_analysis();
        assert!(!a.summary.is_empty());
        assert!(!a.key_skills.is_empty());
        assert_eq!(a.experience_years, 5);
    }

    #[test]
    fn test_final_summary_reports_count_and_uses_markup() {
        let s = final_summary(8, Utc::now());
        assert!(s.contains("8 interview questions"));
        assert!(s.contains("## Professional Assessment Summary"));
        assert!(s.contains("* **Communication**"));
    }
}
