//! Prompt templates sent to the completion backends.

/// System message for backends that accept one.
pub const SHOPPING_ASSISTANT: &str = "You are a helpful shopping assistant that recommends \
products based on user needs. Provide specific brand and product recommendations with \
detailed reasoning.";

/// Ask for 3-5 concrete recommendations in a category for a use case.
pub fn recommendation_prompt(category: &str, use_case: &str) -> String {
    format!(
        "You are helping a customer find the best {category} for {use_case}.

Based on your knowledge, recommend specific brands and products that would be best for this use case.
Explain why you're recommending them and what attributes make them suitable.

Use case: {use_case}
Product category: {category}

Please provide 3-5 specific recommendations with detailed reasoning about:
- Why each product is suitable for this use case
- Key features and attributes that matter
- Any important considerations

Be specific with brand names and product models when possible."
    )
}

/// Ask which attributes the model needs before it would recommend `brand`.
pub fn attribute_prompt(brand: &str, category: &str) -> String {
    format!(
        "What are the most important attributes and information you would need to know about
{brand}'s {category} in order to confidently recommend them to customers?

Please list:
1. Essential product attributes (e.g., specifications, features)
2. Trust signals (e.g., reviews, certifications)
3. Purchase information (e.g., pricing, availability)
4. Any other information that would help you make a recommendation

Be specific and prioritize the attributes by importance."
    )
}
