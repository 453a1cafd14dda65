// All LLM prompt constants for the Analysis Adapter.
// Cross-cutting fragments live in llm_client::prompts.

/// System prompt for CV analysis — enforces JSON-only output.
pub const ANALYZE_SYSTEM: &str =
    "You are an expert career assessment professional. \
    Analyze the provided CV content and produce a complete, honest analysis. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// CV analysis prompt template. Replace `{cv_text}` before sending.
pub const ANALYZE_PROMPT_TEMPLATE: &str = r#"Analyze the following CV and extract structured information.

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "A concise professional summary",
  "key_skills": ["Skill one", "Skill two"],
  "experience_years": 5,
  "career_stage": "Mid-level Professional",
  "notable_achievements": ["Achievement one"],
  "potential_areas_for_growth": ["Growth area one"]
}

Rules:
- summary: 2-3 sentences capturing the professional profile.
- key_skills: the principal skills and competencies, most important first.
- experience_years: estimated total years of experience (estimate if not explicit).
- career_stage: one of entry-level, mid-level, senior, or executive, phrased naturally.
- notable_achievements: concrete accomplishments stated in the CV — do not invent.
- potential_areas_for_growth: areas for professional development suggested by the CV.

CV CONTENT:
{cv_text}"#;

/// System prompt shared by both question-generation calls.
pub const QUESTION_SYSTEM: &str = "You are an expert professional interviewer. \
    Generate one clear, engaging interview question. \
    Respond with the question text only — no numbering, labels, or quotes.";

/// Opening question prompt template.
/// Replace: {summary}, {career_stage}, {key_skills}
pub const FIRST_QUESTION_PROMPT_TEMPLATE: &str = r#"Based on this CV analysis, generate an engaging opening question for a professional assessment interview.

CV analysis:
Summary: {summary}
Career stage: {career_stage}
Key skills: {key_skills}

Generate one thoughtful, personalized question that:
1. Acknowledges their current professional situation
2. Explores their career aspirations or motivations
3. Has a conversational, engaging tone
4. Encourages a detailed answer

Return only the question text, with no extra formatting."#;

/// Follow-up question prompt template.
/// Replace: {summary}, {career_stage}, {last_question}, {last_answer}, {qa_count}
pub const FOLLOWUP_PROMPT_TEMPLATE: &str = r#"You are conducting a structured professional assessment interview. Your goal is to build a complete picture of the candidate for a final assessment report.

You ask one question at a time, informed by:
- The last question asked and the answer received
- The candidate's CV analysis
- How far the interview has progressed

Keep a balance between:
1. Going deeper on something the candidate just mentioned, when relevant, AND
2. Opening a key area not yet covered (challenges, skills development, achievements, motivation, career direction, working under pressure, leadership, strengths and weaknesses)

Candidate profile:
Summary: {summary}
Career stage: {career_stage}

Last exchange (question {qa_count} of the interview):
Q: {last_question}
A: {last_answer}

Criteria for your next question:
- Useful for the final assessment report
- Not redundant with what was already asked
- Surfaces a key piece of information about the candidate
- Phrased naturally and conversationally

Return only the question text."#;

/// System prompt for the final summary call.
pub const SUMMARY_SYSTEM: &str = "You are an expert professional development consultant. \
    Write a complete, structured assessment report in the requested format. \
    Be professional, encouraging, and grounded only in the material provided.";

/// Final summary prompt template.
/// Replace: {summary}, {career_stage}, {experience_years}, {qa_transcript}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r####"You have just conducted a structured professional assessment interview. Using the CV analysis and the full transcript below, write a personalized assessment summary.

The summary must:
- Identify the candidate's strengths and areas for development
- Give concrete, realistic recommendations for professional growth
- Rely only on the answers given — no unfounded speculation
- Use this lightweight markup: "##" for section headings, "###" for sub-headings, "* " for bullet points, "**bold**" and "*italic*" for emphasis
- Be structured in clear sections: ## Executive Summary, ## Assessment, ## Recommendations, ## Priority Actions

CV analysis:
Summary: {summary}
Career stage: {career_stage}
Experience: {experience_years} years

Interview transcript:
{qa_transcript}

Write the structured summary now."####;
