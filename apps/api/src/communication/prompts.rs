// Email instructions. Context values (names, dates, scores) are rendered
// into the input block by the generator; the gateway appends the field list.

pub const INTERVIEW_TASK: &str = "Write a professional interview invitation email for a \
    candidate who has been shortlisted.\n\
    Include:\n\
    - A personalized greeting\n\
    - The job title and the company name\n\
    - A positive comment about their application\n\
    - The interview details if a date is given\n\
    - Instructions for confirming attendance\n\
    - A professional closing signed on behalf of the company\n\
    If the details list missing skills, you may mention that the interview will \
    touch on them, without sounding discouraging.";

pub const REJECTION_TASK: &str = "Write a professional rejection email for a candidate who \
    applied but was not selected.\n\
    Include:\n\
    - A personalized greeting\n\
    - Thanks for their time and application\n\
    - The job title and the company name\n\
    - Encouragement to apply for future positions\n\
    - A professional closing signed on behalf of the company";

pub const DETAILS_LABEL: &str = "Details";
