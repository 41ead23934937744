// Scoring instruction. The field list and the JSON-only footer are appended
// by the extraction gateway from the `match_result` schema.

pub const SCORING_TASK: &str = "Calculate a match score between 0 and 100 for this candidate \
    against the job requirements.\n\
    Weighting policy:\n\
    - skills match: 50%\n\
    - experience match: 30%\n\
    - qualifications match: 20%\n\
    Report each sub-score as a percentage between 0 and 100, and list every required \
    skill, experience item and qualification the candidate is missing.";

pub const JOB_LABEL: &str = "Job Requirements";

pub const CANDIDATE_LABEL: &str = "Candidate Profile";
