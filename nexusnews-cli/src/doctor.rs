use crate::output::mask;
use nexusnews::config::Service;
use nexusnews::{
    ConfigManager, CredentialOverrides, NetworkMonitor, NewsClient, Services, TopHeadlinesQuery,
    describe_error,
};
use std::time::Duration;

const REACH_TIMEOUT: Duration = Duration::from_secs(5);

/// Check the settings file, credentials, reachability and one live call per service.
pub async fn run_doctor(
    manager: &ConfigManager,
    overrides: &CredentialOverrides,
) -> anyhow::Result<bool> {
    println!("📋 Settings: {}", manager.path().display());
    let settings = manager.load()?;

    let monitor = NetworkMonitor::new(false);
    let mut healthy = true;

    let news_host = settings.news.host()?;
    let ai_host = settings.ai.host()?;
    for host in [&news_host, &ai_host] {
        if monitor.check_reachable((host.as_str(), 443), REACH_TIMEOUT).await {
            println!("  Reach {:<24} ✅", host);
        } else {
            println!("  Reach {:<24} ❌ unreachable", host);
            healthy = false;
        }
    }

    let news_key = settings.credential(Service::News, overrides.news_api_key.as_deref());
    let ai_key = settings.credential(Service::Ai, overrides.ai_api_key.as_deref());
    for (service, key) in [(Service::News, &news_key), (Service::Ai, &ai_key)] {
        match key {
            Some(key) => println!("  Key   {:<24} ✅ {}", service.env_var(), mask(key)),
            None => {
                println!("  Key   {:<24} ❌ not set", service.env_var());
                healthy = false;
            }
        }
    }

    if !monitor.is_connected() {
        println!("\nSkipping live checks while offline.");
        return Ok(false);
    }

    let services = Services::build(&settings, overrides, monitor)?;

    if news_key.is_some() {
        let news = NewsClient::new(services.pipeline.clone(), &settings.news.base_url);
        let query = TopHeadlinesQuery {
            page_size: 1,
            ..TopHeadlinesQuery::default()
        };
        match news.top_headlines(&query).await {
            Ok(articles) => println!("  News  top-headlines          ✅ {} article(s)", articles.len()),
            Err(e) => {
                println!("  News  top-headlines          ❌ {}", describe_error(&e).message);
                tracing::debug!(error = %e, "news check failed");
                healthy = false;
            }
        }
    }

    if ai_key.is_some() {
        match services.ai.analyze_sentiment("Doctor check: everything works.").await {
            Ok(sentiment) => println!("  AI    chat/completions       ✅ {}", sentiment),
            Err(e) => {
                println!("  AI    chat/completions       ❌ {}", describe_error(&e).message);
                tracing::debug!(error = %e, "AI check failed");
                healthy = false;
            }
        }
    }

    println!("\nDoctor check complete.");
    Ok(healthy)
}
