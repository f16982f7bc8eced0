//! Instruction prompt and structured-output schema sent with every request.

use serde_json::{json, Value};

/// Instruction prompt for the screening assistant.
pub const SCREENING_PROMPT: &str = r#"You are an AI model specialized in ophthalmological image analysis. Your purpose is to assist in identifying potential eye diseases from images, acting as a preliminary screening tool.

**IMPORTANT:** You are not a doctor. Your analysis is not a medical diagnosis.

**Instructions:**
1.  **Analyze the Image:** Carefully examine the provided image of a human eye.
2.  **Identify Findings:** Look for any abnormalities, signs of disease, or areas of concern.
3.  **Formulate Output:** Respond ONLY with a JSON object that adheres to the provided schema.
4.  **Primary Diagnosis:** Provide the single most likely potential diagnosis based on the visual evidence. If the eye appears healthy, state 'None'.
5.  **Differential Diagnosis:** Provide a list of 2-3 other possible diagnoses, even if their likelihood is lower. For each, include a brief 'reasoning'. If the eye is clearly healthy or you are very certain, this array can be empty.
6.  **Summary:** Write a clear, concise summary explaining your reasoning for the primary diagnosis, referencing the symptoms found. It must be easily understandable by a non-medical person.
7.  **Symptoms & Bounding Boxes:** For each distinct symptom or abnormality found, create a tight-fitting bounding box. The coordinates (x, y, width, height) must be percentages (0-100) of the image dimensions, measured from the top-left corner. For each symptom, also identify the most likely `anatomicalLayer` it appears on (e.g., 'Conjunctiva', 'Sclera', 'Cornea').
8.  **Associated Symptoms:** If a disease is suspected, list common symptoms associated with that condition (e.g., "Blurry vision", "Itching", "Sensitivity to light"). This should be a general list, not just what's in the image.
9.  **Treatment Information:** Briefly describe common, general treatment approaches for the suspected condition. Frame this as informational only. Emphasize that a doctor must be consulted for actual treatment plans. For healthy eyes, use 'N/A'.
10. **Confidence Score:** Provide a confidence score (0-100) for your assessment of the primary diagnosis. A higher score indicates greater certainty. For a healthy eye, the score should be 100.
11. **Next Steps:** Always recommend that the user consult a qualified healthcare professional (like an ophthalmologist) for a definitive diagnosis and treatment, regardless of your findings.
12. **Healthy Eye:** If no abnormalities are found, set `isHealthy` to true, `primaryDiagnosis` to 'None', `treatment` to 'N/A', `confidenceScore` to 100, provide a reassuring summary, and leave the arrays for symptoms, possible symptoms and diagnoses empty."#;

/// Every top-level field of [`super::model::AnalysisResult`], in wire order.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "isHealthy",
    "primaryDiagnosis",
    "summary",
    "symptoms",
    "differentialDiagnoses",
    "possibleSymptoms",
    "treatment",
    "confidenceScore",
    "nextSteps",
];

fn percent(axis: &str) -> Value {
    json!({ "type": "NUMBER", "description": format!("The {} as a percentage (0-100).", axis) })
}

/// Response schema mirroring `AnalysisResult`, in the OpenAPI subset the
/// generateContent endpoint accepts.
pub fn response_schema() -> Value {
    let bounding_box = json!({
        "type": "OBJECT",
        "description": "Bounding box coordinates as percentages.",
        "properties": {
            "x": percent("top-left x-coordinate"),
            "y": percent("top-left y-coordinate"),
            "width": percent("width of the box"),
            "height": percent("height of the box"),
        },
        "required": ["x", "y", "width", "height"],
    });

    let symptom = json!({
        "type": "OBJECT",
        "properties": {
            "name": {
                "type": "STRING",
                "description": "The name of the symptom (e.g., 'Redness', 'Cloudiness', 'Yellowish Bump')."
            },
            "description": {
                "type": "STRING",
                "description": "A brief description of the symptom found in the image."
            },
            "anatomicalLayer": {
                "type": "STRING",
                "description": "The anatomical layer of the eye where the symptom is observed (e.g., 'Conjunctiva', 'Sclera', 'Cornea', 'Iris', 'Lens')."
            },
            "boundingBox": bounding_box,
        },
        "required": ["name", "description", "anatomicalLayer", "boundingBox"],
    });

    let differential = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING", "description": "The name of the alternative disease." },
            "reasoning": { "type": "STRING", "description": "A brief reasoning why this might be a possibility." }
        },
        "required": ["name", "reasoning"],
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "isHealthy": {
                "type": "BOOLEAN",
                "description": "Whether the eye appears healthy."
            },
            "primaryDiagnosis": {
                "type": "STRING",
                "description": "The name of the most likely suspected eye disease. 'None' if healthy."
            },
            "summary": {
                "type": "STRING",
                "description": "A short, easy-to-understand explanation of the findings and the reasoning for the primary diagnosis, written for a non-medical user."
            },
            "symptoms": {
                "type": "ARRAY",
                "description": "A list of detected symptoms or areas of concern visible in the image.",
                "items": symptom,
            },
            "differentialDiagnoses": {
                "type": "ARRAY",
                "description": "A list of other possible diagnoses, ranked by likelihood. Empty array if healthy or if confidence is very high.",
                "items": differential,
            },
            "possibleSymptoms": {
                "type": "ARRAY",
                "description": "A list of common symptoms associated with the primary diagnosis, if any. Empty array if healthy.",
                "items": { "type": "STRING" },
            },
            "treatment": {
                "type": "STRING",
                "description": "General information about potential treatment options for the primary diagnosis. This is NOT a prescription. Must strongly advise consulting a doctor. 'N/A' if healthy."
            },
            "confidenceScore": {
                "type": "NUMBER",
                "description": "A confidence score (0-100) for the primary diagnosis. If healthy, this should be 100."
            },
            "nextSteps": {
                "type": "STRING",
                "description": "Recommended next steps for the user, e.g., 'Consult an ophthalmologist for a comprehensive diagnosis.' Always recommend professional consultation."
            },
        },
        "required": REQUIRED_FIELDS,
    })
}
