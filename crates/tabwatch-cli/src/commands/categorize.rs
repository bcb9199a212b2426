/// Offline categorization preview
use anyhow::Result;
use tabwatch_core::{
    categorizer::{category_hierarchy, classify, ClassificationSource},
    config::get_data_dir,
    event::PageLocation,
    observer::TabSnapshot,
    privacy::PrivacyFilter,
    Config, SettingsStore,
};

fn local_settings() -> Config {
    let loaded = get_data_dir().and_then(|dir| SettingsStore::load(dir.join("settings.json")));
    match loaded {
        Ok(store) => store.into_config(),
        Err(e) => {
            log::warn!("Using default settings: {e:#}");
            Config::default()
        }
    }
}

pub fn categorize_command(url: &str, title: Option<&str>) -> Result<()> {
    let location = PageLocation::parse(url)
        .ok_or_else(|| anyhow::anyhow!("'{url}' is not an absolute URL"))?;
    let config = local_settings();

    let snapshot = TabSnapshot {
        url: Some(url.to_string()),
        title: title.map(String::from),
        incognito: false,
        audible: false,
        tab_count: 1,
    };
    let mut filter = PrivacyFilter::new();
    if let Err(reason) = filter.evaluate(&snapshot, &config) {
        println!("Not tracked: {reason}");
        return Ok(());
    }
    if let Some(title) = title.filter(|_| config.track_titles) {
        println!("Title sent as: {}", filter.redact_title(title, &config));
    }

    let haystack = format!(
        "{} {} {}",
        title.unwrap_or_default(),
        location.url,
        location.domain
    );
    let classification = classify(
        &location.domain,
        &location.path,
        &config.client_keywords,
        &haystack,
    );

    let Some(category) = classification.category else {
        println!("Uncategorized");
        return Ok(());
    };

    match classification.source {
        ClassificationSource::RuleTable(topic) => println!("{category}  (built-in: {topic})"),
        ClassificationSource::ClientKeyword { client, keyword } => {
            println!("{category}  (client '{client}', keyword '{keyword}')");
        }
        ClassificationSource::Uncategorized => println!("{category}"),
    }
    for (depth, level) in category_hierarchy(&category).iter().enumerate() {
        println!("{}{level}", "  ".repeat(depth + 1));
    }
    Ok(())
}
