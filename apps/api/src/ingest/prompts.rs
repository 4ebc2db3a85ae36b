pub const IMAGE_WORDS_INSTRUCTION: &str = "Extract all words from this image. \
Return them as a simple list, one word per line. Only return the words, no other text.";
