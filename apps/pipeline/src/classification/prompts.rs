// Prompt templates for the LLM classification backend.
// Shared fragments live in llm_client::prompts.

/// Relevance system prompt. Lenient: only clear mismatches are rejected.
pub const RELEVANCE_SYSTEM: &str = "You are an expert at matching job postings with candidate profiles. \
    Be LENIENT: mark a job as relevant unless it is clearly a mismatch. \
    A job is IRRELEVANT only when it is in a different field, a specialized role the candidate \
    has no background in, built on a completely different tech stack with no overlap, \
    or drastically mismatched in seniority. When in doubt, mark it as relevant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Replace `{cv_text}` and `{posting_text}` before sending.
pub const RELEVANCE_PROMPT_TEMPLATE: &str = r#"<Candidate CV>
{cv_text}
</Candidate CV>

<Job Posting>
{posting_text}
</Job Posting>

Return a JSON object with this EXACT schema:
{"is_relevant": true}"#;

/// Replace `{category}`, `{exclusion}` and `{posting_text}` before sending.
pub const SKILLS_PROMPT_TEMPLATE: &str = r#"Extract the {category} hard technical skills from the job description below.

Rules:
- {exclusion}
- Exclude soft skills, responsibilities and generic terms such as "software development".
- Return canonical, atomic names: "JS" -> "JavaScript", "TS" -> "TypeScript", "Postgres" -> "PostgreSQL", "k8s" -> "Kubernetes".
- Group interchangeable alternatives: "Python or Ruby" and "Python/Ruby" become one group ["Python", "Ruby"].
- Every group must contain at least one skill. Deduplicate.
- If there are none, return an empty list.

Examples:
"Must have: Python, Django, PostgreSQL. Nice to have: Redis, AWS."
  required -> [["Python"], ["Django"], ["PostgreSQL"]]
  preferred -> [["Redis"], ["AWS"]]
"Required: JavaScript or Python, React or Vue, and Docker."
  required -> [["JavaScript", "Python"], ["React", "Vue"], ["Docker"]]
"We expect strong experience with CI/CD (GitHub Actions) and Docker; familiarity with Kubernetes is a plus."
  required -> [["CI/CD"], ["GitHub Actions"], ["Docker"]]
  preferred -> [["Kubernetes"]]

Return a JSON object with this EXACT schema:
{"skills": [["Skill A", "Alternative to A"], ["Skill B"]]}

<Job Description>
{posting_text}
</Job Description>"#;

pub fn skills_category(mode: super::SkillMode) -> (&'static str, &'static str) {
    match mode {
        super::SkillMode::Required => (
            "must-have / required",
            "Only include skills the posting demands (\"must\", \"required\", \"strong experience with\"). Exclude nice-to-have items.",
        ),
        super::SkillMode::Preferred => (
            "nice-to-have / preferred",
            "Only include skills marked as optional (\"nice to have\", \"a plus\", \"preferred\", \"bonus\"). Exclude required items.",
        ),
    }
}
