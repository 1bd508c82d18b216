use serde_json::{json, Value};

use super::types::ClinicalSummaryRequest;

/// Fixed task instruction for the clinical summary. Output keys must match
/// `ClinicalSummaryResult`.
pub const SUMMARY_INSTRUCTION: &str = r#"Bạn là thư ký y khoa. Hãy phân tích lời kể của bệnh nhân dưới đây và chỉ trả về JSON.
Chỉ ghi nhận thông tin có trong lời kể, không tự chẩn đoán. Trường nào không có thông tin thì để trống.
Yêu cầu JSON có cấu trúc:
{ "symptoms": [], "medicines": [], "vital_signs": { "pulse": "", "temperature": "", "blood_pressure": "", "respiratory_rate": "", "height": "", "weight": "" }, "clinical_note": "" }"#;

/// Join an optional system instruction and the prompt body with a blank line.
pub fn compose_prompt(system_instruction: Option<&str>, body: &str) -> String {
    match system_instruction.filter(|s| !s.trim().is_empty()) {
        Some(system) => format!("{system}\n\n{body}"),
        None => body.to_string(),
    }
}

/// Build the full summary prompt for one intake submission.
pub fn build_summary_prompt(request: &ClinicalSummaryRequest) -> String {
    let mut body = String::from(SUMMARY_INSTRUCTION);
    body.push_str("\n\nNội dung: \"");
    body.push_str(&request.transcript);
    body.push('"');

    for (label, count) in [
        ("Ảnh triệu chứng", request.images.len()),
        ("Ảnh thuốc đang dùng", request.medication_images.len()),
        ("Ảnh kết quả xét nghiệm trước đây", request.previous_result_images.len()),
    ] {
        if count > 0 {
            body.push_str(&format!("\n{label} đính kèm: {count}"));
        }
    }

    compose_prompt(request.system_instruction.as_deref(), &body)
}

/// Gemini `responseSchema` describing `ClinicalSummaryResult`.
pub fn summary_response_schema() -> Value {
    let optional_string = json!({ "type": "STRING", "nullable": true });
    json!({
        "type": "OBJECT",
        "properties": {
            "symptoms": { "type": "ARRAY", "items": { "type": "STRING" } },
            "medicines": { "type": "ARRAY", "items": { "type": "STRING" } },
            "vital_signs": {
                "type": "OBJECT",
                "properties": {
                    "pulse": optional_string,
                    "temperature": optional_string,
                    "blood_pressure": optional_string,
                    "respiratory_rate": optional_string,
                    "height": optional_string,
                    "weight": optional_string
                }
            },
            "clinical_note": { "type": "STRING" }
        },
        "required": ["symptoms", "medicines", "vital_signs", "clinical_note"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_transcript() {
        let req = ClinicalSummaryRequest::from_transcript("Đau họng, sốt nhẹ");
        let prompt = build_summary_prompt(&req);
        assert!(prompt.contains("Đau họng, sốt nhẹ"));
        assert!(prompt.starts_with(SUMMARY_INSTRUCTION));
    }

    #[test]
    fn system_instruction_precedes_transcript() {
        let req = ClinicalSummaryRequest {
            transcript: "Ho kéo dài".into(),
            system_instruction: Some("Luôn trả lời bằng tiếng Việt".into()),
            ..Default::default()
        };
        let prompt = build_summary_prompt(&req);
        let system_at = prompt.find("Luôn trả lời bằng tiếng Việt").unwrap();
        let transcript_at = prompt.find("Ho kéo dài").unwrap();
        assert!(system_at < transcript_at);
        assert!(prompt.starts_with("Luôn trả lời bằng tiếng Việt\n\n"));
    }

    #[test]
    fn compose_without_system_is_identity() {
        assert_eq!(compose_prompt(None, "body"), "body");
        assert_eq!(compose_prompt(Some("   "), "body"), "body");
        assert_eq!(compose_prompt(Some("sys"), "body"), "sys\n\nbody");
    }

    #[test]
    fn system_instruction_is_kept_verbatim() {
        let system = "  Bạn là bác sĩ.\n- Trả lời ngắn gọn.\n";
        assert_eq!(
            compose_prompt(Some(system), "Đau bụng"),
            "  Bạn là bác sĩ.\n- Trả lời ngắn gọn.\n\n\nĐau bụng"
        );
    }

    #[test]
    fn transcript_is_not_escaped() {
        let req = ClinicalSummaryRequest::from_transcript("nói \"đau\" {ngực}");
        assert!(build_summary_prompt(&req).contains("nói \"đau\" {ngực}"));
    }

    #[test]
    fn attachment_counts_listed_per_category() {
        let req = ClinicalSummaryRequest {
            transcript: "Nổi mẩn".into(),
            images: vec!["a".into(), "b".into()],
            previous_result_images: vec!["c".into()],
            ..Default::default()
        };
        let prompt = build_summary_prompt(&req);
        assert!(prompt.contains("Ảnh triệu chứng đính kèm: 2"));
        assert!(prompt.contains("Ảnh kết quả xét nghiệm trước đây đính kèm: 1"));
        assert!(!prompt.contains("Ảnh thuốc đang dùng"));
    }

    #[test]
    fn schema_requires_all_summary_keys() {
        let schema = summary_response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert!(schema["properties"]["vital_signs"]["properties"]["blood_pressure"].is_object());
    }
}
