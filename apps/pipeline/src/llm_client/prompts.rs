// Prompt fragments shared by every LLM-backed capability.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing skills the posting never names.
pub const NO_INFERENCE_INSTRUCTION: &str = "\
    Only use facts stated in the provided text. \
    Do NOT infer skills from job titles, company names or industries. \
    If the text does not mention something, leave it out.";
