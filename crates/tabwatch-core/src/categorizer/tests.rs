use super::*;

// ============================================================================
// categorize: development hosting
// ============================================================================

#[test]
fn test_github_pull_request_is_code_review() {
    assert_eq!(
        categorize("github.com", "/user/repo/pull/123"),
        Some("Work/Development/Code Review")
    );
}

#[test]
fn test_github_issue() {
    assert_eq!(
        categorize("github.com", "/user/repo/issues/1"),
        Some("Work/Development/Issues")
    );
}

#[test]
fn test_github_repo_falls_back_to_base_label() {
    assert_eq!(
        categorize("github.com", "/user/repo"),
        Some("Work/Development")
    );
}

#[test]
fn test_github_pulls_listing_is_not_a_review() {
    // "/pulls" does not contain "/pull/"
    assert_eq!(
        categorize("github.com", "/user/repo/pulls"),
        Some("Work/Development")
    );
}

#[test]
fn test_first_path_rule_wins() {
    // Both "/pull/" and "/issues/" appear; "/pull/" is declared first
    assert_eq!(
        categorize("github.com", "/org/issues/pull/7"),
        Some("Work/Development/Code Review")
    );
}

#[test]
fn test_gitlab_merge_request() {
    assert_eq!(
        categorize("gitlab.com", "/group/project/-/merge_requests/42"),
        Some("Work/Development/Code Review")
    );
}

#[test]
fn test_subdomain_matches() {
    assert_eq!(
        categorize("gist.github.com", "/someone/abc"),
        Some("Work/Development")
    );
}

#[test]
fn test_hostname_is_lowercased() {
    assert_eq!(
        categorize("GitHub.COM", "/User/Repo/Pull/9"),
        Some("Work/Development/Code Review")
    );
}

// ============================================================================
// categorize: productivity and personal groups
// ============================================================================

#[test]
fn test_google_spreadsheet() {
    assert_eq!(
        categorize("docs.google.com", "/spreadsheets/d/1"),
        Some("Work/Data/Spreadsheets")
    );
}

#[test]
fn test_google_document() {
    assert_eq!(
        categorize("docs.google.com", "/document/d/abc/edit"),
        Some("Work/Documentation/Writing")
    );
}

#[test]
fn test_gmail() {
    assert_eq!(
        categorize("mail.google.com", "/mail/u/0/"),
        Some("Work/Communication/Email")
    );
}

#[test]
fn test_jira_wiki_vs_board() {
    assert_eq!(
        categorize("acme.atlassian.net", "/wiki/spaces/ENG"),
        Some("Work/Documentation")
    );
    assert_eq!(
        categorize("acme.atlassian.net", "/browse/ENG-12"),
        Some("Work/Project Management")
    );
}

#[test]
fn test_linkedin_learning_vs_feed() {
    assert_eq!(
        categorize("www.linkedin.com", "/learning/rust-essentials"),
        Some("Research/Learning")
    );
    assert_eq!(
        categorize("www.linkedin.com", "/feed/"),
        Some("Personal/Social Media")
    );
}

#[test]
fn test_short_domain_does_not_match_inside_label() {
    // "x.com" must not claim netflix.com
    assert_eq!(
        categorize("www.netflix.com", "/browse"),
        Some("Personal/Entertainment")
    );
    assert_eq!(categorize("x.com", "/home"), Some("Personal/Social Media"));
    assert_eq!(
        categorize("mobile.x.com", "/home"),
        Some("Personal/Social Media")
    );
    assert_eq!(categorize("www.xbox.com", "/en-US/games"), None);
    assert_eq!(
        categorize("app.box.com", "/folder/0"),
        Some("Work/Documentation/Files")
    );
}

#[test]
fn test_self_hosted_tools_match_inside_label() {
    assert_eq!(
        categorize("acme-jira.example.com", "/browse/OPS-12"),
        Some("Work/Project Management")
    );
    assert_eq!(
        categorize("corp-confluence.example.com", "/display/ENG"),
        Some("Work/Documentation")
    );
    assert_eq!(
        categorize("jira.internal.example", "/"),
        Some("Work/Project Management")
    );
}

#[test]
fn test_anchored_rules_declare_short_domains_only() {
    let anchored: Vec<&str> = RULE_GROUPS
        .iter()
        .flat_map(|g| g.rules.iter())
        .filter(|r| r.anchored)
        .flat_map(|r| r.domains.iter().copied())
        .collect();
    assert_eq!(anchored, vec!["box.com", "x.com"]);
}

#[test]
fn test_youtube_music_before_youtube() {
    assert_eq!(
        categorize("music.youtube.com", "/watch"),
        Some("Personal/Entertainment/Music")
    );
    assert_eq!(
        categorize("www.youtube.com", "/watch"),
        Some("Personal/Entertainment")
    );
}

#[test]
fn test_development_group_beats_shopping() {
    // Also contains "amazon." but the development group is tried first
    assert_eq!(
        categorize("eu-west-1.console.aws.amazon.com", "/ec2"),
        Some("Work/Development/Infrastructure")
    );
    assert_eq!(categorize("www.amazon.de", "/dp/1"), Some("Personal/Shopping"));
}

#[test]
fn test_unknown_domain_is_uncategorized() {
    assert_eq!(categorize("unknown-domain.example", "/"), None);
}

#[test]
fn test_empty_input_is_uncategorized() {
    assert_eq!(categorize("", ""), None);
    assert_eq!(categorize("   ", "/pull/"), None);
}

#[test]
fn test_categorize_is_deterministic() {
    let first = categorize("news.ycombinator.com", "/item?id=1");
    for _ in 0..10 {
        assert_eq!(categorize("news.ycombinator.com", "/item?id=1"), first);
    }
    assert_eq!(first, Some("Personal/News"));
}

#[test]
fn test_explain_reports_topic() {
    let hit = explain("www.figma.com", "/file/abc").unwrap();
    assert_eq!(hit.topic, Topic::Design);
    assert_eq!(hit.label, "Work/Design");
    assert_eq!(hit.topic.to_string(), "design tools");
}

#[test]
fn test_every_label_has_work_research_or_personal_root() {
    for group in RULE_GROUPS {
        for rule in group.rules {
            let labels = std::iter::once(rule.label).chain(rule.paths.iter().map(|p| p.label));
            for label in labels {
                let root = label.split('/').next().unwrap();
                assert!(
                    ["Work", "Research", "Personal"].contains(&root),
                    "unexpected root in {label}"
                );
            }
        }
    }
}

// ============================================================================
// client keywords
// ============================================================================

fn clients() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert(
        "Acme".to_string(),
        vec!["acme-corp".to_string(), "ACME Portal".to_string()],
    );
    map.insert("Globex".to_string(), vec!["globex".to_string()]);
    map
}

#[test]
fn test_detect_client_case_insensitive() {
    let hit = detect_client(&clients(), "Dashboard - acme portal");
    assert_eq!(hit, Some(("Acme".to_string(), "ACME Portal".to_string())));
}

#[test]
fn test_detect_client_ignores_blank_keywords() {
    let mut map = BTreeMap::new();
    map.insert("Blank".to_string(), vec!["  ".to_string()]);
    assert_eq!(detect_client(&map, "anything at all"), None);
}

#[test]
fn test_classify_prefers_rule_table() {
    let result = classify(
        "github.com",
        "/acme-corp/api",
        &clients(),
        "acme-corp/api github.com",
    );
    assert_eq!(result.category.as_deref(), Some("Work/Development"));
    assert_eq!(
        result.source,
        ClassificationSource::RuleTable(Topic::DevelopmentHosting)
    );
}

#[test]
fn test_classify_falls_back_to_client() {
    let result = classify(
        "portal.globex.example",
        "/",
        &clients(),
        "Globex portal https://portal.globex.example/",
    );
    assert_eq!(result.category.as_deref(), Some("Work/Client/Globex"));
    assert!(matches!(
        result.source,
        ClassificationSource::ClientKeyword { ref client, .. } if client == "Globex"
    ));
}

#[test]
fn test_youtube_tutorial_is_learning() {
    let result = classify(
        "www.youtube.com",
        "/watch",
        &BTreeMap::new(),
        "Rust Tutorial for Beginners - YouTube https://www.youtube.com/watch?v=zF34dRivLOw www.youtube.com",
    );
    assert_eq!(result.category.as_deref(), Some("Research/Learning"));
    assert_eq!(result.source, ClassificationSource::RuleTable(Topic::Learning));

    let course = classify(
        "youtube.com",
        "/watch",
        &BTreeMap::new(),
        "Full COURSE: Linear Algebra",
    );
    assert_eq!(course.category.as_deref(), Some("Research/Learning"));
}

#[test]
fn test_youtube_without_learning_keyword_stays_entertainment() {
    let result = classify(
        "www.youtube.com",
        "/watch",
        &BTreeMap::new(),
        "Cat compilation - YouTube https://www.youtube.com/watch?v=abc www.youtube.com",
    );
    assert_eq!(result.category.as_deref(), Some("Personal/Entertainment"));

    // Only watch pages are refined
    let channel = classify(
        "www.youtube.com",
        "/@someone",
        &BTreeMap::new(),
        "Learn with me",
    );
    assert_eq!(channel.category.as_deref(), Some("Personal/Entertainment"));

    // The host-only lookup has no title to go on
    assert_eq!(
        categorize("www.youtube.com", "/watch"),
        Some("Personal/Entertainment")
    );
}

#[test]
fn test_classify_uncategorized() {
    let result = classify("unknown-domain.example", "/", &BTreeMap::new(), "");
    assert_eq!(result.category, None);
    assert_eq!(result.source, ClassificationSource::Uncategorized);
}

// ============================================================================
// hierarchy
// ============================================================================

#[test]
fn test_category_hierarchy() {
    assert_eq!(
        category_hierarchy("Work/Development/Coding"),
        vec!["Work", "Work/Development", "Work/Development/Coding"]
    );
    assert_eq!(category_hierarchy("Personal"), vec!["Personal"]);
    assert!(category_hierarchy("").is_empty());
}
