// Cross-cutting prompt fragments shared by every structured-output call.
// Task-specific instructions live next to the module that issues them.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant for a recruiting team. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Closing line appended to every structured-extraction instruction.
pub const JSON_ONLY_FOOTER: &str = "Return ONLY the JSON object, no additional text or explanation.";
