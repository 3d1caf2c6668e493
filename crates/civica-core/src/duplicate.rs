use crate::classify::extract_json_object;
use crate::error::ModelError;
use crate::error::ScanError;
use crate::media;
use crate::model::{GenerateRequest, GenerativeModel, Part};
use crate::types::{DuplicateVerdict, Issue};
use serde::Deserialize;

const COMPARE_MIME: &str = "image/jpeg";
const UNVERIFIED_REASON: &str = "Could not verify.";

/// An existing open issue the scan reported as the same physical defect.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub issue_id: String,
    pub reason: String,
}

pub(crate) fn build_prompt() -> String {
    const JSON_SCHEMA_SAMPLE: &str = r#"
{
    "isDuplicate": false,
    "reason": "different intersection and different crack pattern"
}
"#;
    format!(
        r#"
<task>
Compare these two images of civic issues. Image 1 is a new report. Image 2
is an existing report. Do they appear to be the EXACT same specific issue
(e.g. the exact same pothole, same garbage pile) from the same or different
angle? Ignore generic similarities (like "both are potholes"); look for
specific visual identifiers. Return only JSON.
</task>

<schema>
Output JSON matching this schema:
{schema}
</schema>
"#,
        schema = JSON_SCHEMA_SAMPLE
    )
}

/// Ask the model whether two photos show the same physical defect. A failed
/// or malformed call counts as "not a duplicate" so a flaky model can never
/// merge two distinct reports.
pub fn compare_images(
    model: &dyn GenerativeModel,
    new_image: &[u8],
    existing_image: &[u8],
) -> DuplicateVerdict {
    let request = GenerateRequest {
        system: None,
        history: Vec::new(),
        parts: vec![
            Part::Text(build_prompt()),
            Part::InlineImage {
                mime: COMPARE_MIME.to_string(),
                data: new_image.to_vec(),
            },
            Part::InlineImage {
                mime: COMPARE_MIME.to_string(),
                data: existing_image.to_vec(),
            },
        ],
        json_response: true,
    };

    match model.generate(&request).and_then(|raw| parse_verdict(&raw)) {
        Ok(verdict) => verdict,
        Err(err) => {
            eprintln!("duplicate check failed: {err}");
            DuplicateVerdict {
                is_duplicate: false,
                reason: UNVERIFIED_REASON.to_string(),
            }
        }
    }
}

/// Scan the collection for an open issue showing the same defect as the
/// candidate. Comparisons run sequentially in collection order
/// (most-recent-first) and stop at the first reported duplicate; that
/// first-match order is the defined tie-break. Pairs whose existing image
/// cannot be loaded are skipped rather than failing the scan.
pub fn scan_for_duplicate(
    model: &dyn GenerativeModel,
    agent: &ureq::Agent,
    issues: &[Issue],
    candidate_id: &str,
) -> Result<Option<DuplicateMatch>, ScanError> {
    let candidate = issues
        .iter()
        .find(|issue| issue.id == candidate_id)
        .ok_or_else(|| ScanError::UnknownIssue(candidate_id.to_string()))?;
    let candidate_image = candidate.image.as_deref().ok_or(ScanError::MissingImage)?;
    let candidate_bytes = media::load_image_bytes(agent, candidate_image)
        .map_err(|err| ScanError::Unreadable(err.to_string()))?;

    for other in issues {
        if other.id == candidate.id {
            continue;
        }
        let Some(other_image) = other.image.as_deref() else {
            continue;
        };
        if !other.status.is_open() {
            continue;
        }
        let Ok(other_bytes) = media::load_image_bytes(agent, other_image) else {
            continue;
        };

        let verdict = compare_images(model, &candidate_bytes, &other_bytes);
        if verdict.is_duplicate {
            return Ok(Some(DuplicateMatch {
                issue_id: other.id.clone(),
                reason: verdict.reason,
            }));
        }
    }

    Ok(None)
}

pub(crate) fn parse_verdict(raw: &str) -> Result<DuplicateVerdict, ModelError> {
    let payload = if let Ok(payload) = serde_json::from_str::<VerdictPayload>(raw) {
        payload
    } else {
        let json = extract_json_object(raw)
            .ok_or_else(|| ModelError::InvalidResponse("no json object found".into()))?;
        serde_json::from_str(json).map_err(|e| ModelError::InvalidResponse(e.to_string()))?
    };
    Ok(DuplicateVerdict {
        is_duplicate: payload.is_duplicate,
        reason: payload.reason.unwrap_or_default(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictPayload {
    is_duplicate: bool,
    #[serde(default)]
    reason: Option<String>,
}
