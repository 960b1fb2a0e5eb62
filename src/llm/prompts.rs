//! Prompt templates for narrative generation

use std::collections::HashMap;

/// Template for generating prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template with variables
    #[must_use]
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut result = self.template.clone();
        for var in &self.variables {
            if let Some(value) = values.get(var) {
                result = result.replace(&format!("{{{{{var}}}}}"), value);
            }
        }
        result
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next(); // skip second '{'
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

pub const CLUSTER_LABEL_SYSTEM: &str = r"You are an expert at analyzing social media content themes. Your task is to provide a concise, descriptive label for a group of related posts.

Rules:
- Keep labels to 2-4 words maximum
- Be specific and descriptive
- Use title case
- Focus on the topic/theme, not the format
- Output ONLY the label, nothing else";

pub const CAST_FEEDBACK_SYSTEM: &str = r#"You are a Farcaster growth coach analyzing post performance. Your job is to explain why a post performed well or poorly and give actionable advice.

Output Format (strict JSON):
{
  "likelyCauses": ["cause 1", "cause 2"],
  "whatToReplicate": ["action 1", "action 2"],
  "whatToAvoid": ["action 1"],
  "summary": "One sentence summary of the key insight"
}

Rules:
- Be specific and actionable
- Reference the actual content and metrics
- Keep each bullet to 1-2 sentences max
- For top performers: focus on what to replicate
- For underperformers: focus on what to avoid/improve
- Consider: timing, format, topic, engagement hooks, length"#;

pub const WEEKLY_BRIEF_SYSTEM: &str = r#"You are a Farcaster influence coach creating a weekly brief for a content creator. Your brief should be immediately actionable and specific.

Output Format (strict JSON):
{
  "win": {
    "title": "Short title (3-5 words)",
    "description": "What improved and why (1-2 sentences)",
    "metric": "metric name",
    "value": "specific value or change"
  },
  "weakness": {
    "title": "Short title (3-5 words)",
    "description": "The bottleneck and its impact (1-2 sentences)",
    "metric": "metric name",
    "value": "specific value"
  },
  "experiment": {
    "title": "Short action title (3-5 words)",
    "description": "What to try and why (1-2 sentences)",
    "templateCast": "An example cast they could post (actual text)",
    "rationale": "Why this experiment addresses the weakness (1 sentence)"
  }
}

Rules:
- Be SPECIFIC - use actual numbers and observations
- Make the experiment directly address the weakness
- The template cast should be immediately usable
- Keep all text concise and scannable"#;

/// Coaching prompt templates
pub struct CoachPrompts;

impl CoachPrompts {
    /// Cluster labeling prompt
    #[must_use]
    pub fn cluster_label() -> PromptTemplate {
        PromptTemplate::new(
            r"Here are sample posts from a cluster:

{{samples}}

Keywords extracted: {{keywords}}

What is the best 2-4 word label for this topic cluster?",
        )
    }

    /// Per-cast feedback prompt
    #[must_use]
    pub fn cast_feedback() -> PromptTemplate {
        PromptTemplate::new(
            r#"Analyze this {{performance_label}} Farcaster post:

POST TEXT:
"{{text}}"

METRICS:
- Engagement Score: {{engagement_score}} ({{vs_median}}% vs median)
- Likes: {{likes}}
- Recasts: {{recasts}}
- Replies: {{replies}}
- Reply Velocity: {{velocity}}

CONTENT FEATURES:
- Has question: {{has_question}}
- Has CTA: {{has_cta}}
- Sentiment: {{sentiment}}
- Word count: {{word_count}}
- Has media: {{has_media}}
- Theme: {{theme}}

Provide feedback in JSON format:"#,
        )
    }

    /// Weekly brief prompt
    #[must_use]
    pub fn weekly_brief() -> PromptTemplate {
        PromptTemplate::new(
            r"Create a weekly brief for @{{username}}

OVERVIEW:
- Total casts analyzed: {{total_casts}}
- Median engagement score: {{median_engagement}}
- Reply rate: {{reply_rate}}% of posts got replies
- Repeat replier rate: {{repeat_replier_rate}}% of repliers came back
{{reciprocity_line}}
THEMES:
- Top themes: {{top_themes}}
- Best performing theme: {{top_theme}} (avg engagement: {{top_theme_engagement}})

CONTENT ANALYSIS:
- Posts with questions get {{question_impact}}% engagement
- Posts with CTAs get {{cta_impact}}% engagement
- Top posts avg {{avg_words_top}} words, bottom posts avg {{avg_words_bottom}} words

TOP PERFORMING POSTS:
{{top_samples}}

UNDERPERFORMING POSTS:
{{bottom_samples}}

Generate a weekly brief in JSON format:",
        )
    }
}

/// Number samples as a quoted list, one per line, truncated per sample
pub fn numbered_samples(texts: &[String], max_chars: usize) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let truncated: String = t.chars().take(max_chars).collect();
            format!("{}. \"{}\"", i + 1, truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
