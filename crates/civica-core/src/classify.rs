use crate::error::ModelError;
use crate::model::{GenerateRequest, GenerativeModel, Part};
use crate::types::{Classification, Priority};
use serde::Deserialize;

/// Closed category set the classifier must choose from.
pub const CATEGORIES: [&str; 8] = [
    "Roads & Safety",
    "Garbage & Sanitation",
    "Water Supply",
    "Electricity",
    "Public Transport",
    "Traffic",
    "Parks & Trees",
    "Other",
];

/// Closed department set the classifier must route to.
pub const DEPARTMENTS: [&str; 5] = [
    "Public Works",
    "Municipal Corp",
    "Traffic Police",
    "Water Board",
    "Electric Board",
];

pub const FALLBACK_CATEGORY: &str = "Uncategorized";
pub const FALLBACK_DEPARTMENT: &str = "General Administration";
pub const FALLBACK_SUMMARY: &str = "Issue reported";

const DEFAULT_REJECTION_REASON: &str = "Image does not look like a civic issue.";

pub(crate) fn build_prompt(description: Option<&str>) -> String {
    const JSON_SCHEMA_SAMPLE: &str = r#"
{
    "isCivicIssue": true,
    "rejectionReason": "",
    "category": "Roads & Safety",
    "department": "Public Works",
    "priority": "HIGH",
    "summary": "Deep pothole near signal"
}
"#;
    let description_block = description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("User description context:\n{value}\n"))
        .unwrap_or_default();
    let categories = CATEGORIES.join("', '");
    let departments = DEPARTMENTS.join("', '");

    format!(
        r#"
<task>
You are the intake classifier for a civic issue reporting platform. Analyze
the attached photo of a reported issue and return only JSON.
</task>

<schema>
Output JSON matching this schema:
{schema}
</schema>

<rules>
1. VALIDATION: Determine if this is a valid civic issue (pothole, garbage,
   broken street light, water leakage, fallen tree, illegal parking, broken
   infrastructure). If it is a selfie, a person, a pet, a blurry unusable
   photo, or an indoor private object, set "isCivicIssue" to false and give
   a short "rejectionReason".
2. CATEGORIZATION: If valid, strictly categorize into one of:
   '{categories}'.
3. PRIORITY: Assess urgency by hazard level: HIGH for immediate danger,
   MEDIUM for inconvenience, LOW for cosmetic.
4. DEPARTMENT: Assign to one of: '{departments}'.
5. SUMMARY: A concise title for the issue, at most 5 words.
</rules>

<input_description>
{description_block}
</input_description>
"#,
        schema = JSON_SCHEMA_SAMPLE,
        categories = categories,
        departments = departments,
        description_block = description_block
    )
}

/// Obtain a structured classification for a captured image. The model is an
/// untrusted boundary and may fail or return junk; this call never does.
/// Any failure degrades to the conservative fallback so a human moderator
/// can recategorize later.
pub fn analyze_issue(
    model: &dyn GenerativeModel,
    description: Option<&str>,
    image: Option<(&str, &[u8])>,
) -> Classification {
    let mut parts = vec![Part::Text(build_prompt(description))];
    if let Some((mime, data)) = image {
        parts.push(Part::InlineImage {
            mime: mime.to_string(),
            data: data.to_vec(),
        });
    }
    let request = GenerateRequest {
        system: None,
        history: Vec::new(),
        parts,
        json_response: true,
    };

    match model
        .generate(&request)
        .and_then(|raw| parse_classification(&raw))
    {
        Ok(classification) => classification,
        Err(err) => {
            eprintln!("classification failed, using fallback: {err}");
            fallback_classification(description)
        }
    }
}

/// The deterministic stand-in applied when the classifier is unreachable.
pub fn fallback_classification(description: Option<&str>) -> Classification {
    let summary = description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(FALLBACK_SUMMARY)
        .to_string();
    Classification {
        is_civic_issue: true,
        rejection_reason: None,
        category: FALLBACK_CATEGORY.to_string(),
        department: FALLBACK_DEPARTMENT.to_string(),
        priority: Priority::Medium,
        summary,
    }
}

/// Validate a raw model reply against the output contract. Rejections only
/// need the verdict and a reason; accepted issues must carry the full field
/// set with closed-set category and department values.
pub(crate) fn parse_classification(raw: &str) -> Result<Classification, ModelError> {
    let payload = deserialize_payload(raw)?;

    if !payload.is_civic_issue {
        let reason = payload
            .rejection_reason
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        return Ok(Classification {
            is_civic_issue: false,
            rejection_reason: Some(reason),
            category: String::new(),
            department: String::new(),
            priority: Priority::Medium,
            summary: String::new(),
        });
    }

    let category = required_member(payload.category, &CATEGORIES, "category")?;
    let department = required_member(payload.department, &DEPARTMENTS, "department")?;
    let priority = match payload.priority.as_deref() {
        Some("LOW") => Priority::Low,
        Some("MEDIUM") => Priority::Medium,
        Some("HIGH") => Priority::High,
        Some(other) => {
            return Err(ModelError::InvalidResponse(format!(
                "priority out of range: {other}"
            )));
        }
        None => return Err(ModelError::InvalidResponse("priority missing".into())),
    };
    let summary = payload
        .summary
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ModelError::InvalidResponse("summary missing".into()))?;

    Ok(Classification {
        is_civic_issue: true,
        rejection_reason: None,
        category,
        department,
        priority,
        summary,
    })
}

fn deserialize_payload(raw: &str) -> Result<ClassificationPayload, ModelError> {
    if let Ok(payload) = serde_json::from_str::<ClassificationPayload>(raw) {
        return Ok(payload);
    }
    let json = extract_json_object(raw)
        .ok_or_else(|| ModelError::InvalidResponse("no json object found".into()))?;
    serde_json::from_str(json).map_err(|e| ModelError::InvalidResponse(e.to_string()))
}

fn required_member(
    value: Option<String>,
    allowed: &[&str],
    field: &str,
) -> Result<String, ModelError> {
    let value = value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ModelError::InvalidResponse(format!("{field} missing")))?;
    if !allowed.contains(&value.as_str()) {
        return Err(ModelError::InvalidResponse(format!(
            "{field} out of range: {value}"
        )));
    }
    Ok(value)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationPayload {
    is_civic_issue: bool,
    #[serde(default)]
    rejection_reason: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

pub(crate) fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&input[start..=end])
}
