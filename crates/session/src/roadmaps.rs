//! Preset roadmap.sh catalog with keyword search.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoadmapLink {
    pub name: &'static str,
    pub slug: &'static str,
}

impl RoadmapLink {
    pub fn url(&self) -> String {
        format!("https://roadmap.sh/{}", self.slug)
    }
}

const fn roadmap(name: &'static str, slug: &'static str) -> RoadmapLink {
    RoadmapLink { name, slug }
}

/// Role-based roadmaps, shown when no query is given.
pub static TOP_ROADMAPS: [RoadmapLink; 20] = [
    roadmap("Frontend", "frontend"),
    roadmap("Backend", "backend"),
    roadmap("Full Stack", "full-stack"),
    roadmap("DevOps", "devops"),
    roadmap("AI & Data Scientist", "ai-data-scientist"),
    roadmap("Data Analyst", "data-analyst"),
    roadmap("Android", "android"),
    roadmap("iOS", "ios"),
    roadmap("Cyber Security", "cyber-security"),
    roadmap("Blockchain", "blockchain"),
    roadmap("QA / Testing", "qa"),
    roadmap("System Design", "system-design"),
    roadmap("Python", "python"),
    roadmap("Java", "java"),
    roadmap("JavaScript", "javascript"),
    roadmap("React", "react"),
    roadmap("Node.js", "nodejs"),
    roadmap("AWS", "aws"),
    roadmap("Docker", "docker"),
    roadmap("Kubernetes", "kubernetes"),
];

pub static SKILL_ROADMAPS: [RoadmapLink; 40] = [
    roadmap("SQL", "sql"),
    roadmap("Computer Science", "computer-science"),
    roadmap("React", "react"),
    roadmap("Vue", "vue"),
    roadmap("Angular", "angular"),
    roadmap("JavaScript", "javascript"),
    roadmap("TypeScript", "typescript"),
    roadmap("Node.js", "nodejs"),
    roadmap("Python", "python"),
    roadmap("System Design", "system-design"),
    roadmap("Java", "java"),
    roadmap("ASP.NET Core", "aspnet-core"),
    roadmap("API Design", "api-design"),
    roadmap("Spring Boot", "spring-boot"),
    roadmap("Flutter", "flutter"),
    roadmap("C++", "cpp"),
    roadmap("Rust", "rust"),
    roadmap("Go", "go"),
    roadmap("Design and Architecture", "design-system"),
    roadmap("GraphQL", "graphql"),
    roadmap("React Native", "react-native"),
    roadmap("Design System", "design-system"),
    roadmap("Prompt Engineering", "prompt-engineering"),
    roadmap("MongoDB", "mongodb"),
    roadmap("Linux", "linux"),
    roadmap("Kubernetes", "kubernetes"),
    roadmap("Docker", "docker"),
    roadmap("AWS", "aws"),
    roadmap("Terraform", "terraform"),
    roadmap("Data Structures & Algorithms", "dsa"),
    roadmap("Redis", "redis"),
    roadmap("Git and GitHub", "git-github"),
    roadmap("PHP", "php"),
    roadmap("Cloudflare", "cloudflare"),
    roadmap("AI Red Teaming", "ai-red-teaming"),
    roadmap("AI Agents", "ai-agents"),
    roadmap("HTML", "html"),
    roadmap("CSS", "css"),
    roadmap("Swift & SwiftUI", "swift"),
    roadmap("Shell / Bash", "bash"),
];

/// Find roadmaps whose name or slug contains `query`.
///
/// Top roadmaps are searched before skill roadmaps and a name listed in both
/// is reported once, at its first position. A blank query returns the top
/// list unchanged.
pub fn search(query: &str) -> Vec<RoadmapLink> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return TOP_ROADMAPS.to_vec();
    }

    let mut hits: Vec<RoadmapLink> = Vec::new();
    for entry in TOP_ROADMAPS.iter().chain(SKILL_ROADMAPS.iter()) {
        let matches = entry.name.to_lowercase().contains(&query) || entry.slug.contains(&query);
        if matches && !hits.iter().any(|h| h.name == entry.name) {
            hits.push(*entry);
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(links: &[RoadmapLink]) -> Vec<&'static str> {
        links.iter().map(|l| l.name).collect()
    }

    #[test]
    fn blank_query_returns_top_list() {
        assert_eq!(search("   "), TOP_ROADMAPS.to_vec());
    }

    #[test]
    fn matches_name_case_insensitively() {
        assert_eq!(names(&search("  DevOps ")), vec!["DevOps"]);
    }

    #[test]
    fn matches_slug() {
        assert_eq!(names(&search("dsa")), vec!["Data Structures & Algorithms"]);
        assert_eq!(names(&search("cpp")), vec!["C++"]);
    }

    #[test]
    fn shared_names_are_reported_once_in_first_position() {
        let hits = search("react");
        assert_eq!(names(&hits), vec!["React", "React Native"]);

        let hits = search("python");
        assert_eq!(names(&hits), vec!["Python"]);
    }

    #[test]
    fn same_slug_different_names_are_both_kept() {
        let hits = search("design-system");
        assert_eq!(names(&hits), vec!["Design and Architecture", "Design System"]);
    }

    #[test]
    fn top_entries_come_before_skill_entries() {
        let hits = search("java");
        assert_eq!(names(&hits), vec!["Java", "JavaScript"]);
    }

    #[test]
    fn unknown_query_has_no_hits() {
        assert!(search("underwater basket weaving").is_empty());
    }

    #[test]
    fn url_points_at_roadmap_sh() {
        assert_eq!(search("rust")[0].url(), "https://roadmap.sh/rust");
    }
}
