use anyhow::Result;
use mailchimp::{Client, RequestOptions};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    // Reads the key from MAILCHIMP_API_KEY.
    let client = Client::from_env()?;

    let ping = client.get("/ping", None).await?;
    println!("ping: {}", ping.get("health_status").unwrap_or(&json!("?")));

    let query = json!({"fields": ["lists.id", "lists.name", "lists.stats.member_count"], "count": 10});
    let lists = client.get("/lists", query.as_object().cloned()).await?;

    for list in lists.get("lists").and_then(|v| v.as_array()).into_iter().flatten() {
        let id = list["id"].as_str().unwrap_or_default();
        let members = RequestOptions::new("/lists/{list_id}/members")
            .path_param("list_id", id)
            .query(json!({"count": 1}).as_object().cloned().unwrap_or_default());
        let page = client.request(Some(members)).await?;
        println!(
            "{} ({}): {} member(s)",
            list["name"].as_str().unwrap_or_default(),
            id,
            page.get("total_items").unwrap_or(&json!(0))
        );
    }

    Ok(())
}
