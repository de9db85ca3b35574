use once_cell::sync::Lazy;
use regex::Regex;

pub const TECH_KEYWORDS: [&str; 26] = [
    "React",
    "Angular",
    "Vue",
    "Node.js",
    "Python",
    "Django",
    "Flask",
    "Ruby on Rails",
    "PHP",
    "Laravel",
    "Java",
    "Spring",
    ".NET",
    "AWS",
    "Google Cloud",
    "Azure",
    "Docker",
    "Kubernetes",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "Machine Learning",
    "AI",
    "Blockchain",
    "IoT",
];

// Keywords must not be glued to other letters or digits, so `AI` does not fire
// inside `email` and `Java` not inside `JavaScript`.
static TECH_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TECH_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = format!(r"(?i)(?:^|[^a-z0-9]){}(?:$|[^a-z0-9])", regex::escape(kw));
            (*kw, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Technology keywords found in the markup, in keyword table order.
pub fn detect_tech_stack(markup: &str) -> Vec<String> {
    TECH_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(markup))
        .map(|(kw, _)| kw.to_string())
        .collect()
}
