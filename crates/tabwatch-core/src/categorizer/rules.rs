//! Built-in category table.
//!
//! Groups are listed in precedence order: development first, then generic
//! productivity, then research, then personal browsing. Inside a group the
//! first entry whose domain matches wins, so more specific hosts go first.
//!
//! Domains match as substrings of the hostname (`jira` hits
//! `acme-jira.example.com`). Short domains that sit inside other brands are
//! declared with `anchored` and only match at a hostname label start.

use std::fmt;

/// Path sub-rule: the first needle contained in the request path wins.
#[derive(Debug)]
pub struct PathRule {
    pub needle: &'static str,
    pub label: &'static str,
}

#[derive(Debug)]
pub struct CategoryRule {
    pub domains: &'static [&'static str],
    pub paths: &'static [PathRule],
    pub label: &'static str,
    /// Match only where a hostname label starts
    pub anchored: bool,
}

/// Keyword refinement on top of a table hit.
///
/// Applies when the host contains one of `domains`, the path contains `path`
/// and the page title or URL contains one of `keywords`.
#[derive(Debug)]
pub struct ContentRule {
    pub domains: &'static [&'static str],
    pub path: &'static str,
    pub keywords: &'static [&'static str],
    pub topic: Topic,
    pub label: &'static str,
}

/// Topic a group of rules belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    DevelopmentHosting,
    Documentation,
    ProjectManagement,
    Communication,
    Office,
    Design,
    Learning,
    Social,
    Entertainment,
    Shopping,
    News,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DevelopmentHosting => "development hosting",
            Self::Documentation => "documentation",
            Self::ProjectManagement => "project management",
            Self::Communication => "communication",
            Self::Office => "office suites",
            Self::Design => "design tools",
            Self::Learning => "learning",
            Self::Social => "social media",
            Self::Entertainment => "entertainment",
            Self::Shopping => "shopping",
            Self::News => "news",
        };
        f.write_str(name)
    }
}

pub struct RuleGroup {
    pub topic: Topic,
    pub rules: &'static [CategoryRule],
}

const fn rule(domains: &'static [&'static str], label: &'static str) -> CategoryRule {
    CategoryRule {
        domains,
        paths: &[],
        label,
        anchored: false,
    }
}

const fn anchored(domains: &'static [&'static str], label: &'static str) -> CategoryRule {
    CategoryRule {
        domains,
        paths: &[],
        label,
        anchored: true,
    }
}

const fn with_paths(
    domains: &'static [&'static str],
    paths: &'static [PathRule],
    label: &'static str,
) -> CategoryRule {
    CategoryRule {
        domains,
        paths,
        label,
        anchored: false,
    }
}

const fn path(needle: &'static str, label: &'static str) -> PathRule {
    PathRule { needle, label }
}

const CODE_REVIEW: &str = "Work/Development/Code Review";
const ISSUES: &str = "Work/Development/Issues";
const CI: &str = "Work/Development/CI";
const DEVELOPMENT: &str = "Work/Development";

const SPREADSHEETS: &str = "Work/Data/Spreadsheets";
const WRITING: &str = "Work/Documentation/Writing";
const PRESENTATIONS: &str = "Work/Documentation/Presentations";
const FILES: &str = "Work/Documentation/Files";

const PROJECT_MANAGEMENT: &str = "Work/Project Management";
const SOCIAL: &str = "Personal/Social Media";
const LEARNING: &str = "Research/Learning";
const ENTERTAINMENT: &str = "Personal/Entertainment";

const DEVELOPMENT_HOSTING: &[CategoryRule] = &[
    with_paths(
        &["github.com"],
        &[
            path("/pull/", CODE_REVIEW),
            path("/issues/", ISSUES),
            path("/actions", CI),
        ],
        DEVELOPMENT,
    ),
    with_paths(
        &["gitlab.com"],
        &[
            path("/merge_requests/", CODE_REVIEW),
            path("/issues/", ISSUES),
            path("/pipelines", CI),
        ],
        DEVELOPMENT,
    ),
    with_paths(
        &["bitbucket.org"],
        &[path("/pull-requests/", CODE_REVIEW), path("/issues/", ISSUES)],
        DEVELOPMENT,
    ),
    with_paths(
        &["dev.azure.com"],
        &[
            path("/pullrequest/", CODE_REVIEW),
            path("/_workitems", ISSUES),
            path("/_build", CI),
        ],
        DEVELOPMENT,
    ),
    rule(&["codeberg.org", "sr.ht", "gitea.com"], DEVELOPMENT),
    rule(
        &[
            "stackoverflow.com",
            "stackexchange.com",
            "serverfault.com",
            "superuser.com",
        ],
        "Work/Development/Research",
    ),
    rule(
        &[
            "console.aws.amazon.com",
            "portal.azure.com",
            "console.cloud.google.com",
            "vercel.com",
            "netlify.com",
            "cloudflare.com",
        ],
        "Work/Development/Infrastructure",
    ),
    rule(
        &["crates.io", "npmjs.com", "pypi.org", "pkg.go.dev"],
        "Work/Development/Packages",
    ),
    rule(
        &["codepen.io", "codesandbox.io", "replit.com", "play.rust-lang.org"],
        "Work/Development/Coding",
    ),
];

const DOCUMENTATION: &[CategoryRule] = &[
    rule(
        &[
            "docs.rs",
            "doc.rust-lang.org",
            "developer.mozilla.org",
            "docs.python.org",
            "readthedocs.io",
            "learn.microsoft.com",
            "devdocs.io",
        ],
        "Work/Development/Documentation",
    ),
    rule(
        &["notion.so", "confluence", "gitbook.io", "readme.io"],
        "Work/Documentation",
    ),
];

const PROJECT_TRACKERS: &[CategoryRule] = &[
    with_paths(
        &["atlassian.net"],
        &[path("/wiki", "Work/Documentation")],
        PROJECT_MANAGEMENT,
    ),
    rule(
        &[
            "jira",
            "linear.app",
            "asana.com",
            "trello.com",
            "monday.com",
            "clickup.com",
            "basecamp.com",
            "plane.so",
            "shortcut.com",
        ],
        PROJECT_MANAGEMENT,
    ),
];

const COMMUNICATION: &[CategoryRule] = &[
    rule(
        &[
            "mail.google.com",
            "outlook.office.com",
            "outlook.office365.com",
            "outlook.live.com",
            "mail.proton.me",
            "fastmail.com",
        ],
        "Work/Communication/Email",
    ),
    rule(
        &["meet.google.com", "zoom.us", "whereby.com", "webex.com"],
        "Work/Communication/Meetings",
    ),
    rule(
        &[
            "slack.com",
            "teams.microsoft.com",
            "teams.live.com",
            "chat.google.com",
            "discord.com",
        ],
        "Work/Communication/Chat",
    ),
    rule(&["calendar.google.com"], "Work/Communication/Calendar"),
];

const OFFICE: &[CategoryRule] = &[
    with_paths(
        &["docs.google.com"],
        &[
            path("/spreadsheets", SPREADSHEETS),
            path("/document", WRITING),
            path("/presentation", PRESENTATIONS),
            path("/forms", "Work/Data/Forms"),
        ],
        "Work/Documentation",
    ),
    rule(&["sheets.google.com", "airtable.com"], SPREADSHEETS),
    rule(&["slides.google.com"], PRESENTATIONS),
    with_paths(
        &["sharepoint.com", "onedrive.live.com"],
        &[
            path("/:x:/", SPREADSHEETS),
            path("/:w:/", WRITING),
            path("/:p:/", PRESENTATIONS),
        ],
        FILES,
    ),
    rule(&["drive.google.com", "dropbox.com", "office.com"], FILES),
    // xbox.com
    anchored(&["box.com"], FILES),
];

const DESIGN: &[CategoryRule] = &[rule(
    &[
        "figma.com",
        "miro.com",
        "canva.com",
        "sketch.com",
        "excalidraw.com",
        "lucid.app",
        "whimsical.com",
    ],
    "Work/Design",
)];

const LEARNING_SITES: &[CategoryRule] = &[
    rule(
        &[
            "udemy.com",
            "coursera.org",
            "edx.org",
            "khanacademy.org",
            "pluralsight.com",
            "frontendmasters.com",
            "egghead.io",
        ],
        LEARNING,
    ),
    rule(
        &[
            "wikipedia.org",
            "arxiv.org",
            "scholar.google.com",
            "medium.com",
            "dev.to",
            "substack.com",
        ],
        "Research/Reading",
    ),
];

const SOCIAL_MEDIA: &[CategoryRule] = &[
    with_paths(&["linkedin.com"], &[path("/learning", LEARNING)], SOCIAL),
    rule(
        &[
            "facebook.com",
            "twitter.com",
            "instagram.com",
            "reddit.com",
            "threads.net",
            "bsky.app",
            "mastodon.social",
            "tiktok.com",
        ],
        SOCIAL,
    ),
    // netflix.com, dropbox.com
    anchored(&["x.com"], SOCIAL),
];

const ENTERTAINMENT_SITES: &[CategoryRule] = &[
    rule(
        &[
            "music.youtube.com",
            "open.spotify.com",
            "soundcloud.com",
            "music.apple.com",
        ],
        "Personal/Entertainment/Music",
    ),
    rule(
        &[
            "youtube.com",
            "netflix.com",
            "twitch.tv",
            "hulu.com",
            "disneyplus.com",
            "primevideo.com",
        ],
        ENTERTAINMENT,
    ),
];

const SHOPPING: &[CategoryRule] = &[rule(
    &[
        "amazon.",
        "ebay.",
        "etsy.com",
        "aliexpress.com",
        "walmart.com",
        "bestbuy.com",
    ],
    "Personal/Shopping",
)];

const NEWS: &[CategoryRule] = &[rule(
    &[
        "news.ycombinator.com",
        "news.google.com",
        "nytimes.com",
        "bbc.com",
        "bbc.co.uk",
        "theguardian.com",
        "reuters.com",
        "cnn.com",
        "theverge.com",
    ],
    "Personal/News",
)];

/// Tried before the table; the first match wins.
pub const CONTENT_RULES: &[ContentRule] = &[ContentRule {
    domains: &["youtube.com"],
    path: "/watch",
    keywords: &["tutorial", "learn", "course"],
    topic: Topic::Learning,
    label: LEARNING,
}];

/// Groups in the order they are tried.
pub const RULE_GROUPS: &[RuleGroup] = &[
    RuleGroup {
        topic: Topic::DevelopmentHosting,
        rules: DEVELOPMENT_HOSTING,
    },
    RuleGroup {
        topic: Topic::Documentation,
        rules: DOCUMENTATION,
    },
    RuleGroup {
        topic: Topic::ProjectManagement,
        rules: PROJECT_TRACKERS,
    },
    RuleGroup {
        topic: Topic::Communication,
        rules: COMMUNICATION,
    },
    RuleGroup {
        topic: Topic::Office,
        rules: OFFICE,
    },
    RuleGroup {
        topic: Topic::Design,
        rules: DESIGN,
    },
    RuleGroup {
        topic: Topic::Learning,
        rules: LEARNING_SITES,
    },
    RuleGroup {
        topic: Topic::Social,
        rules: SOCIAL_MEDIA,
    },
    RuleGroup {
        topic: Topic::Entertainment,
        rules: ENTERTAINMENT_SITES,
    },
    RuleGroup {
        topic: Topic::Shopping,
        rules: SHOPPING,
    },
    RuleGroup {
        topic: Topic::News,
        rules: NEWS,
    },
];
