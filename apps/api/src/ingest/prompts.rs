// Extraction instructions for ingestion. The gateway appends the field list
// from the target schema and the JSON-only footer.

pub const JOB_SUMMARY_TASK: &str = "Analyze the following job description and extract the key \
    hiring requirements. Keep list entries short (a skill, a qualification, or one \
    responsibility per entry). Use an empty list when the description says nothing \
    about a field.";

pub const JOB_LABEL: &str = "Job Description";

pub const CANDIDATE_PROFILE_TASK: &str = "Analyze the following CV text and extract structured \
    information about the candidate. Copy names, companies and institutions exactly as \
    written. Use an empty string for unknown durations or years rather than guessing.";

pub const CV_LABEL: &str = "CV Text";
