use nexusnews::{Article, ModelDescriptor, ModelPreference, Resource};
use serde::Serialize;

/// Print one state of a tri-state result. Returns false for errors.
pub fn render<T>(state: &Resource<T>, show: impl FnOnce(&T)) -> bool {
    match state {
        Resource::Loading => {
            eprintln!("Loading...");
            true
        }
        Resource::Success(value) => {
            show(value);
            true
        }
        Resource::Error(report) => {
            let hint = if report.recoverable {
                "retrying later may help"
            } else {
                "retrying will not help"
            };
            eprintln!("❌ {} ({})", report.message, hint);
            false
        }
    }
}

pub fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles.");
        return;
    }
    for (i, article) in articles.iter().enumerate() {
        println!(
            "{:>2}. {} [{}] {}",
            i + 1,
            article.title,
            article.source,
            article.published_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(description) = article.description.as_deref() {
            println!("    {}", description);
        }
        if !article.tags.is_empty() {
            println!("    tags: {}", article.tags.join(", "));
        }
        println!("    {}", article.url);
    }
}

pub fn pretty<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => format!("<unprintable result: {}>", e),
    }
}

fn print_model(model: &ModelDescriptor, marker: &str) {
    let star = if model.recommended { "★" } else { " " };
    println!(
        "{} {} {:<48} {:<20} ctx={}",
        marker, star, model.id, model.display_name, model.max_context_tokens
    );
}

pub fn print_models(catalog: &[ModelDescriptor], preference: &ModelPreference) {
    println!("Catalog:");
    for model in catalog {
        let marker = if model.id == preference.primary { "*" } else { " " };
        print_model(model, marker);
    }
    println!(
        "\nCall order (fallback depth {}):",
        preference.fallback_depth
    );
    for (i, model) in preference.ordered().iter().enumerate() {
        print_model(model, &(i + 1).to_string());
    }
}

/// First few characters of a secret, for display.
pub fn mask(key: &str) -> String {
    let head: String = key.chars().take(4).collect();
    format!("{}…", head)
}
