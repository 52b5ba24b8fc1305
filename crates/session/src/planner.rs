//! Offline learning-plan fallback.
//!
//! When live generation is unavailable the student still gets a structured
//! plan: a curated track is picked by keyword and rendered as markdown. Pure
//! and deterministic; never touches the network.

use std::fmt;
use std::str::FromStr;

use nextstep_core::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl StudyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for StudyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(Error::InvalidInput(format!("unknown study level: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceLink {
    pub name: &'static str,
    pub url: &'static str,
}

const fn link(name: &'static str, url: &'static str) -> ResourceLink {
    ResourceLink { name, url }
}

/// A curated topic with its trigger keywords and resource lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    pub key: &'static str,
    pub title: &'static str,
    /// Lowercase substrings; any match selects the track.
    pub keywords: &'static [&'static str],
    pub websites: &'static [ResourceLink],
    pub youtube: &'static [ResourceLink],
    pub courses: &'static [ResourceLink],
    pub books: &'static [ResourceLink],
    pub practice: &'static [ResourceLink],
    pub certs: &'static [ResourceLink],
}

/// Tracks in match order. The first track with a matching keyword wins.
pub static TRACKS: [Track; 3] = [
    Track {
        key: "ai_ml",
        title: "AI / ML",
        keywords: &["ai", "ml", "machine learning", "deep learning", "data science"],
        websites: &[
            link("Python Docs", "https://docs.python.org/3/"),
            link("NumPy Docs", "https://numpy.org/doc/"),
            link("pandas Docs", "https://pandas.pydata.org/docs/"),
            link("scikit-learn Docs", "https://scikit-learn.org/stable/"),
        ],
        youtube: &[
            link("freeCodeCamp", "https://www.youtube.com/@freecodecamp"),
            link("StatQuest", "https://www.youtube.com/@statquest"),
        ],
        courses: &[
            link("Kaggle Learn", "https://www.kaggle.com/learn"),
            link(
                "Google ML Crash Course",
                "https://developers.google.com/machine-learning/crash-course",
            ),
            link("NPTEL", "https://nptel.ac.in/"),
        ],
        books: &[link(
            "Hands-On Machine Learning",
            "https://www.oreilly.com/library/view/hands-on-machine-learning/9781098125967/",
        )],
        practice: &[
            link("Kaggle", "https://www.kaggle.com/"),
            link("LeetCode", "https://leetcode.com/"),
        ],
        certs: &[link(
            "Google Cloud Skills Boost",
            "https://www.cloudskillsboost.google/",
        )],
    },
    Track {
        key: "backend",
        title: "Backend Development",
        keywords: &["backend", "node", "api", "spring", "django", "flask"],
        websites: &[
            link("MDN Web Docs", "https://developer.mozilla.org/"),
            link("Node.js Docs", "https://nodejs.org/docs/latest/api/"),
            link("PostgreSQL Docs", "https://www.postgresql.org/docs/"),
        ],
        youtube: &[
            link("Traversy Media", "https://www.youtube.com/@TraversyMedia"),
            link("freeCodeCamp", "https://www.youtube.com/@freecodecamp"),
        ],
        courses: &[
            link("The Odin Project", "https://www.theodinproject.com/"),
            link("Full Stack Open", "https://fullstackopen.com/en/"),
        ],
        books: &[link(
            "Designing Data-Intensive Applications",
            "https://dataintensive.net/",
        )],
        practice: &[
            link("LeetCode", "https://leetcode.com/"),
            link("Exercism", "https://exercism.org/"),
        ],
        certs: &[link("AWS Skill Builder", "https://skillbuilder.aws/")],
    },
    Track {
        key: "gate",
        title: "GATE / Engineering Exams",
        keywords: &["gate", "ese", "ssc je", "upsc", "psu"],
        websites: &[
            link("GATE Official", "https://gate2026.iitg.ac.in/"),
            link("NPTEL", "https://nptel.ac.in/"),
        ],
        youtube: &[link("NPTEL", "https://www.youtube.com/@nptelhrd")],
        courses: &[link("SWAYAM", "https://swayam.gov.in/")],
        books: &[link(
            "Standard Core Subject Textbooks",
            "https://nptel.ac.in/course.html",
        )],
        practice: &[link(
            "Official Previous Year Papers (Institute/Official Sources)",
            "https://gate2026.iitg.ac.in/",
        )],
        certs: &[link("NPTEL Certificates", "https://nptel.ac.in/noc/")],
    },
];

/// Index into [`TRACKS`] used when no keyword matches.
const DEFAULT_TRACK: usize = 1;

/// Pick the track for a free-text query.
///
/// Matching is a case-insensitive substring test, so short keywords such as
/// `"ai"` also fire inside longer words.
pub fn pick_track(query: &str) -> &'static Track {
    let query = query.to_lowercase();
    TRACKS
        .iter()
        .find(|track| track.keywords.iter().any(|k| query.contains(k)))
        .unwrap_or(&TRACKS[DEFAULT_TRACK])
}

/// Split weekly hours into concepts, practice, and projects.
///
/// The three rows always sum to `weekly_hours`.
pub fn weekly_split(weekly_hours: u32) -> [u32; 3] {
    let third = weekly_hours / 3;
    [third, third, weekly_hours - 2 * third]
}

/// Render the offline plan for `query`.
pub fn plan(query: &str, level: StudyLevel, weekly_hours: u32, include_extra: bool) -> String {
    let track = pick_track(query);
    let [concepts, practice, projects] = weekly_split(weekly_hours);

    let mut out = String::new();
    out.push_str("### Goal Understanding\n");
    out.push_str(&format!("- Target track identified: **{}**\n", track.title));
    out.push_str(&format!("- Current level considered: **{level}**\n"));
    out.push_str(&format!(
        "- Weekly effort planned: **{weekly_hours} hours/week**\n"
    ));

    out.push_str("\n### Best Resource Stack\n");
    stack_group(
        &mut out,
        "Websites / Docs",
        track.websites,
        &["Official docs and fundamentals", "Core reference for concepts"],
    );
    stack_group(&mut out, "YouTube Channels", track.youtube, &["Clear practical explanations"]);
    stack_group(&mut out, "Courses / Tutorials", track.courses, &["Structured learning path"]);
    stack_group(&mut out, "Recommended Books", track.books, &["Strong conceptual depth"]);
    stack_group(
        &mut out,
        "Practice Platforms",
        track.practice,
        &["Practice and progress tracking"],
    );
    stack_group(
        &mut out,
        "Certification Options",
        track.certs,
        &["Recognized certificate path"],
    );

    out.push_str(
        "### Basic Roadmap\n\
         1. Foundation (Weeks 1-2): Core concepts + official docs\n\
         2. Build (Weeks 3-6): Guided course + small projects/problems\n\
         3. Practice (Weeks 7-10): Daily problem solving + revision\n\
         4. Polish (Weeks 11-12): Mock tests/interview prep + portfolio updates\n",
    );

    out.push_str("\n### Weekly Timetable\n| Task | Hours/Week |\n|---|---:|\n");
    out.push_str(&format!("| Concepts + Docs | {concepts} |\n"));
    out.push_str(&format!("| Practice / Problems | {practice} |\n"));
    out.push_str(&format!("| Projects / Revision | {projects} |\n"));

    out.push_str(
        "\n### Quick Start Checklist (7 Days)\n\
         - Day 1: Finalize track + bookmark official resources\n\
         - Day 2-3: Complete first core module\n\
         - Day 4-5: Solve beginner practice set\n\
         - Day 6: Build mini artifact (notes/project/problem sheet)\n\
         - Day 7: Weekly review and next-week plan\n",
    );

    out.push_str(
        "\n### Quality Notes\n\
         - Links above prioritize official docs and trusted education platforms.\n\
         - For latest exam/course updates, always verify on official pages.",
    );

    if include_extra {
        out.push_str(
            "\n\n### AI Learning Plan Generator Output\n\
             - Week A: Skill baseline and diagnostics\n\
             - Week B: Core learning sprint\n\
             - Week C: Practice and project sprint\n\
             - Week D: Review, gaps, and optimization",
        );
    }

    out
}

/// One bold heading followed by a line per described link.
fn stack_group(out: &mut String, heading: &str, links: &[ResourceLink], reasons: &[&str]) {
    out.push_str(&format!("**{heading}**\n"));
    for (link, reason) in links.iter().zip(reasons) {
        out.push_str(&format!("- {} | {} | {}\n", link.name, reason, link.url));
    }
    out.push('\n');
}
