// Enrichment prompt templates.

pub const DEFINITION_PROMPT_TEMPLATE: &str = "Provide a definition, pronunciation (IPA), \
part of speech, and example sentence for the {target_language} word \"{word}\" in \
{definition_language}. Format as JSON: \
{\"definition\": \"...\", \"pronunciation\": \"...\", \"partOfSpeech\": \"...\", \"example\": \"...\"}";

pub const IMAGE_PROMPT_TEMPLATE: &str = "A simple, clear illustration representing the word \
\"{word}\" ({definition}). Educational style, clean background, suitable for language \
learning flashcards.";

/// Token budget for a definition reply.
pub const DEFINITION_MAX_TOKENS: u32 = 200;
