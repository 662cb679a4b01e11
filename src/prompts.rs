//! Prompt text for every provider call the pipeline makes.

use crate::db::posts::ContentType;

pub const JOURNALIST_SYSTEM: &str = "You are a senior technology journalist writing for an \
independent tech news blog. You write accurate, well-structured markdown articles, attribute \
statistics and quotes to their sources, and never invent facts. Start every article with a \
single level-1 heading containing the headline.";

pub const TOPIC_SYSTEM: &str = "You are the assignment editor of a tech news blog. You reply \
with exactly one article topic and nothing else.";

pub const FACT_CHECK_SYSTEM: &str = "You are a meticulous fact-checker. You extract factual \
claims from articles and judge how verifiable they are. You reply with JSON only.";

pub const SEO_SYSTEM: &str = "You are an SEO editor. You reply with JSON only.";

/// Structural requirements for one content type.
#[derive(Debug, Clone, Copy)]
pub struct ContentTemplate {
    pub label: &'static str,
    pub min_words: usize,
    pub sections: &'static [&'static str],
    pub rules: &'static [&'static str],
}

pub fn template_for(content_type: ContentType) -> ContentTemplate {
    match content_type {
        ContentType::News => ContentTemplate {
            label: "news story",
            min_words: 800,
            sections: &["Lede paragraph", "What happened", "Why it matters", "What's next"],
            rules: &[
                "Answer who, what, when, where and why in the first two paragraphs",
                "Attribute every statistic and quote to a named source",
            ],
        },
        ContentType::AiNews => ContentTemplate {
            label: "AI industry news story",
            min_words: 800,
            sections: &[
                "Lede paragraph",
                "The announcement",
                "How it works",
                "Industry impact",
                "What's next",
            ],
            rules: &[
                "Explain technical concepts for a general tech audience",
                "Separate vendor claims from independently verified results",
            ],
        },
        ContentType::Review => ContentTemplate {
            label: "product review",
            min_words: 1200,
            sections: &[
                "Verdict summary",
                "Design and build",
                "Performance",
                "Pros and cons",
                "Rating",
            ],
            rules: &[
                "Include a bulleted pros list and a bulleted cons list",
                "End with a rating out of 10 on its own line, formatted as **Rating: X/10**",
            ],
        },
        ContentType::Guide => ContentTemplate {
            label: "buying guide",
            min_words: 1500,
            sections: &[
                "Who this guide is for",
                "How we picked",
                "Comparison table",
                "Top picks",
                "What to look for",
            ],
            rules: &[
                "Include a markdown comparison table with at least four products",
                "Give each pick a short 'best for' label",
            ],
        },
        ContentType::Comparison => ContentTemplate {
            label: "head-to-head comparison",
            min_words: 1200,
            sections: &[
                "At a glance",
                "Specifications",
                "Head-to-head",
                "Which should you choose",
            ],
            rules: &[
                "Include a markdown specification table comparing both products",
                "Declare a winner for each head-to-head category",
            ],
        },
        ContentType::Roundup => ContentTemplate {
            label: "news roundup",
            min_words: 1000,
            sections: &["Introduction", "The stories", "The week ahead"],
            rules: &[
                "Cover at least five separate stories, each under its own level-3 heading",
                "Keep each story to two or three short paragraphs",
            ],
        },
        ContentType::Article => ContentTemplate {
            label: "feature article",
            min_words: 1000,
            sections: &["Introduction", "Background", "Analysis", "Conclusion"],
            rules: &["Use bullet lists where they aid scanning"],
        },
    }
}

pub fn system_prompt(content_type: ContentType) -> String {
    let template = template_for(content_type);
    format!(
        "{}\n\nYou are writing a {}. Use markdown: level-2 headings for sections, \
         bullet lists where useful, short paragraphs.",
        JOURNALIST_SYSTEM, template.label
    )
}

/// User prompt for an article. `context` is appended only when non-empty.
pub fn article_prompt(content_type: ContentType, topic: &str, context: Option<&str>) -> String {
    let template = template_for(content_type);
    let mut prompt = format!(
        "Write a {} about: {}\n\nRequirements:\n- At least {} words\n- Required sections: {}\n",
        template.label,
        topic,
        template.min_words,
        template.sections.join(", ")
    );
    for rule in template.rules {
        prompt.push_str(&format!("- {}\n", rule));
    }
    prompt.push_str("- Begin with a level-1 heading containing a headline of 30 to 70 characters\n");

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(
            "\nReference material from articles we have already published. Use it to match \
             our house style and to stay consistent with facts we have reported. Do not copy \
             it verbatim.\n\n",
        );
        prompt.push_str(context);
        prompt.push('\n');
    }
    prompt
}

pub fn topic_prompt(category: &str, content_type: ContentType) -> String {
    format!(
        "Suggest one specific, timely topic for a {} in our \"{}\" category. \
         It should be concrete enough to research today, not a broad theme. \
         Reply with the topic only, on a single line, without quotes.",
        template_for(content_type).label,
        category
    )
}

pub fn fact_check_prompt(content: &str) -> String {
    format!(
        "Extract the factual claims from the article below and rate its overall factual \
         accuracy from 0 to 100.\n\n\
         Reply with a single JSON object of this shape:\n\
         {{\"claims\": [{{\"claim\": \"...\", \"type\": \"STATISTIC|QUOTE|FACT|PREDICTION\", \
         \"hasSource\": true, \"confidence\": \"HIGH|MEDIUM|LOW|UNVERIFIABLE\"}}], \
         \"accuracyScore\": 0}}\n\n\
         Article:\n{}",
        content
    )
}

pub fn seo_prompt(title: &str, content: &str) -> String {
    format!(
        "Suggest SEO metadata for this article.\n\
         Reply with a single JSON object: {{\"keywords\": [\"...\"], \"metaDescription\": \"...\"}}\n\
         Use at most 10 keywords. The meta description must be 120 to 160 characters.\n\n\
         Title: {}\n\n{}",
        title, content
    )
}
