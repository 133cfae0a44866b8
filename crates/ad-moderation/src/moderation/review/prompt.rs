use crate::moderation::domain::AdFields;

/// Review rules, in the order the model is asked to apply them.
pub const RULES: [&str; 7] = [
    "Inappropriate, offensive, or abusive language is never allowed, whether written in English, Urdu script (e.g., کار برائے فروخت) or Roman Urdu (e.g., gari for sale).",
    "Claims made by the seller are allowed even if they are subjective, promotional or unverifiable. Accept phrases such as \"just buy and drive\", \"no work required\" or \"like new\", and accept car-related modifications or accessories (alloy rims, LCD, new tires, sound system) as long as they are not misleading or suspicious.",
    "Mentions of \"minor touch\", \"accidental\" or \"paint touch-up\" are allowed when the wording is professional and the ad is truthful.",
    "Irrelevant, suspicious, spammy or non-car-related content is not allowed.",
    "Reject the ad if the description contradicts the car details provided. For example, a description saying \"Selling Honda Civic\" while the selected brand/model is \"Toyota Corolla\" is a mismatch.",
    "Mentions of \"duplicate file\" or \"duplicate book\" are allowed.",
    "If the description mentions both \"duplicate\" and \"original\" together (e.g., \"duplicate and original file\", \"original and duplicate book\"), the ad must be rejected.",
];

/// Build the full review prompt for one ad.
pub fn render(fields: &AdFields) -> String {
    let rules = RULES
        .iter()
        .enumerate()
        .map(|(index, rule)| format!("{}. {}", index + 1, rule))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an AI content reviewer for a multilingual car marketplace.

Sellers may write ads in English, Urdu script or Roman Urdu.

Review the ad description against the following rules:

{rules}

Ad details:

- Brand: {brand}
- Model: {model}
- Variant: {variant}
- Year: {year}
- Mileage: {mileage}
- Fuel Type: {fuel_type}
- Engine Type (cc): {engine_type}
- Transmission: {transmission}
- Condition: {condition}
- Description: {description}

Respond only with a single valid JSON object in exactly this format, with no other text:

{{
  "decision": "Approve" or "Reject",
  "reason": "Explain clearly why the ad was approved or rejected, naming any mismatch, inappropriate language or other rule violation."
}}
"#,
        brand = fields.brand,
        model = fields.model,
        variant = fields.variant,
        year = fields.year,
        mileage = fields.mileage,
        fuel_type = fields.fuel_type,
        engine_type = fields.engine_type,
        transmission = fields.transmission,
        condition = fields.condition,
        description = fields.description,
    )
}
