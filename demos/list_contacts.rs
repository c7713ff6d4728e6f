use sheetbot_http::{ContactFilter, ContactStats, ContactsClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = ContactsClient::from_env().map_err(anyhow::Error::msg)?;
    let search = std::env::args().nth(1).unwrap_or_default();

    let list = match client.load_contacts().await {
        Ok(list) => list,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    };

    let stats = ContactStats::from_contacts(&list.contacts);
    println!(
        "{} contacts, {} with the bot on, {} with a human",
        stats.total, stats.bot, stats.human
    );

    for contact in ContactFilter::new().with_search(&search).apply(&list.contacts) {
        println!(
            "{:<30} {:<18} {:<4} {}",
            contact.name,
            contact.phone,
            contact.bot_mode,
            contact.last_interaction.as_deref().unwrap_or("-")
        );
    }

    for rejected in &list.rejected {
        eprintln!("skipped row {}: {}", rejected.index, rejected.error);
    }

    Ok(())
}
