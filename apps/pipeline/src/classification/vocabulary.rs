//! Curated technical-skill vocabulary with alias normalization.
//!
//! Matching works on lowercased text and respects word boundaries, so `Java`
//! never matches inside `JavaScript`. At each position the longest term wins.

use std::collections::BTreeSet;

/// Canonical name followed by its lowercase spellings. The lowercased canonical
/// form is included implicitly unless it is listed in `AMBIGUOUS`.
const SKILLS: &[(&str, &[&str])] = &[
    ("JavaScript", &["js", "ecmascript"]),
    ("TypeScript", &["ts"]),
    ("Python", &["python3"]),
    ("Java", &[]),
    ("Kotlin", &[]),
    ("Scala", &[]),
    ("Go", &["golang"]),
    ("Rust", &[]),
    ("C++", &["cpp"]),
    ("C#", &["c sharp", "csharp"]),
    (".NET", &["dotnet", ".net core", "asp.net"]),
    ("PHP", &[]),
    ("Ruby", &[]),
    ("Ruby on Rails", &["rails", "ror"]),
    ("Swift", &[]),
    ("Objective-C", &[]),
    ("Elixir", &[]),
    ("SQL", &[]),
    ("Node.js", &["node", "nodejs"]),
    ("React", &["react.js", "reactjs"]),
    ("React Native", &[]),
    ("Next.js", &["nextjs"]),
    ("Vue", &["vue.js", "vuejs"]),
    ("Angular", &["angularjs"]),
    ("Svelte", &[]),
    ("Redux", &[]),
    ("GraphQL", &[]),
    ("REST API", &["restful", "rest apis"]),
    ("gRPC", &[]),
    ("Django", &[]),
    ("Flask", &[]),
    ("FastAPI", &[]),
    ("Spring", &["spring boot", "spring framework"]),
    ("Laravel", &[]),
    ("Express.js", &["expressjs"]),
    ("NestJS", &["nest.js"]),
    ("PostgreSQL", &["postgres", "psql"]),
    ("MySQL", &[]),
    ("MongoDB", &["mongo"]),
    ("Redis", &[]),
    ("Elasticsearch", &["elastic search"]),
    ("Kafka", &["apache kafka"]),
    ("RabbitMQ", &[]),
    ("ClickHouse", &[]),
    ("Docker", &[]),
    ("Kubernetes", &["k8s"]),
    ("Terraform", &[]),
    ("Ansible", &[]),
    ("AWS", &["amazon web services"]),
    ("GCP", &["google cloud", "google cloud platform"]),
    ("Azure", &["microsoft azure"]),
    ("CI/CD", &["ci / cd", "cicd"]),
    ("GitHub Actions", &[]),
    ("GitLab CI", &[]),
    ("Jenkins", &[]),
    ("Git", &[]),
    ("Linux", &[]),
    ("HTML", &["html5"]),
    ("CSS", &["css3"]),
    ("Tailwind", &["tailwindcss", "tailwind css"]),
    ("Webpack", &[]),
    ("Jest", &[]),
    ("Pytest", &[]),
    ("Selenium", &[]),
    ("Playwright", &[]),
    ("Pandas", &[]),
    ("NumPy", &[]),
    ("PyTorch", &[]),
    ("TensorFlow", &[]),
    ("Spark", &["apache spark", "pyspark"]),
    ("Airflow", &["apache airflow"]),
    ("Figma", &[]),
    ("1C", &["1с"]),
];

/// Canonical spellings that are also plain English words.
const AMBIGUOUS: &[&str] = &["go", "spring"];

/// A vocabulary hit within a lowercased text, as byte offsets into that text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub start: usize,
    pub end: usize,
    pub skill: &'static str,
}

pub struct Vocabulary {
    /// (lowercase term, canonical), longest term first.
    terms: Vec<(String, &'static str)>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut terms: Vec<(String, &'static str)> = SKILLS
            .iter()
            .flat_map(|(canonical, aliases)| {
                let lowered = canonical.to_lowercase();
                let own = (!AMBIGUOUS.contains(&lowered.as_str())).then_some(lowered);
                own.into_iter()
                    .chain(aliases.iter().map(|a| a.to_string()))
                    .map(move |term| (term, *canonical))
            })
            .collect();
        terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        terms.dedup_by(|a, b| a.0 == b.0);
        Self { terms }
    }

    /// Non-overlapping mentions in `lowered`, which must already be lowercase.
    pub fn mentions(&self, lowered: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        let mut pos = 0;
        while pos < lowered.len() {
            let rest = &lowered[pos..];
            let hit = is_boundary_before(lowered, pos)
                .then(|| {
                    self.terms.iter().find(|(term, _)| {
                        rest.starts_with(term.as_str())
                            && is_boundary_after(lowered, pos + term.len())
                    })
                })
                .flatten();

            match hit {
                Some((term, skill)) => {
                    let end = pos + term.len();
                    mentions.push(Mention {
                        start: pos,
                        end,
                        skill: *skill,
                    });
                    pos = end;
                }
                None => pos += rest.chars().next().map_or(1, char::len_utf8),
            }
        }
        mentions
    }

    /// Distinct canonical skills named anywhere in `text`.
    pub fn skills_in(&self, text: &str) -> BTreeSet<&'static str> {
        self.mentions(&text.to_lowercase())
            .into_iter()
            .map(|m| m.skill)
            .collect()
    }
}

fn is_boundary_before(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .map_or(true, |c| !is_word_char(c))
}

fn is_boundary_after(text: &str, pos: usize) -> bool {
    text[pos..].chars().next().map_or(true, |c| !is_word_char(c))
}

/// `+`, `#` and apostrophes count as word characters, so `it's` holds no `ts`.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '+' | '#' | '\'' | '’')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(text: &str) -> Vec<&'static str> {
        Vocabulary::new().skills_in(text).into_iter().collect()
    }

    #[test]
    fn test_aliases_normalize_to_canonical_names() {
        assert_eq!(
            skills("JS, Postgres and k8s"),
            vec!["JavaScript", "Kubernetes", "PostgreSQL"]
        );
    }

    #[test]
    fn test_java_does_not_match_inside_javascript() {
        assert_eq!(skills("Strong JavaScript"), vec!["JavaScript"]);
        assert_eq!(skills("Java 17, Spring Boot"), vec!["Java", "Spring"]);
    }

    #[test]
    fn test_plain_english_words_are_not_skills() {
        assert!(skills("Let's go, it's time to rest").is_empty());
        assert_eq!(skills("Golang or Go"), vec!["Go"]);
    }

    #[test]
    fn test_longest_term_wins() {
        assert_eq!(skills("React Native developer"), vec!["React Native"]);
        assert_eq!(skills("Node.js services"), vec!["Node.js"]);
    }

    #[test]
    fn test_symbol_terms_respect_boundaries() {
        assert_eq!(skills("C++ and C#"), vec!["C#", "C++"]);
        assert_eq!(skills("CI/CD pipelines"), vec!["CI/CD"]);
    }

    #[test]
    fn test_mention_offsets_point_into_lowered_text() {
        let text = "python/ruby";
        let mentions = Vocabulary::new().mentions(text);
        assert_eq!(mentions.len(), 2);
        assert_eq!(&text[mentions[0].end..mentions[1].start], "/");
    }
}
