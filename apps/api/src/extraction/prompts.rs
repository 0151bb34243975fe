/// System prompt for skill entity extraction. Enforces JSON-only output.
pub const SKILL_EXTRACTION_SYSTEM: &str = "You are a precise skill tagger for résumés and job descriptions. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// `{text}` is replaced with the document to tag.
pub const SKILL_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Tag every SKILL entity in the document below.

A skill is a concrete competency a person can have: a programming language,
framework, tool, platform, method, domain of expertise, or a named soft skill.
Do NOT return job titles, company names, degrees, locations, or years of experience.
Return each skill as a short phrase exactly as it would appear on a skills list,
without qualifiers such as "strong" or "5+ years of".

Respond with:
{"skills": ["skill one", "skill two"]}

Document:
"""
{text}
""""#;
