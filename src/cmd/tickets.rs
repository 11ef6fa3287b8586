use crate::context::AppContext;
use crate::domain::ticket::{FeedSource, TicketCollection};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct TicketsCommandArgs {
    pub json: bool,
}

/// Runs a single fetch through the gateway and prints the result.
pub async fn run(ctx: &AppContext, args: TicketsCommandArgs) -> AppResult<()> {
    let collection = ctx.tickets.fetch().await;

    if args.json {
        let rendered = serde_json::to_string_pretty(collection.as_ref())
            .map_err(|err| AppError::Decode(format!("failed to render tickets: {err}")))?;
        println!("{rendered}");
    } else {
        for line in render_lines(&collection) {
            println!("{line}");
        }
    }

    if let Some(err) = ctx.tickets.status().last_error {
        eprintln!("Warning: live fetch failed: {err}");
    }
    Ok(())
}

fn render_lines(collection: &TicketCollection) -> Vec<String> {
    let mut lines: Vec<String> = collection
        .tickets
        .iter()
        .map(|ticket| {
            format!(
                "{:<12} {:<12} {:<8} {:<20} {}",
                ticket.key, ticket.status, ticket.priority, ticket.assignee, ticket.title
            )
        })
        .collect();

    let source = match collection.source {
        FeedSource::Live => "live",
        FeedSource::Snapshot => "snapshot",
        FeedSource::Fallback => "fallback",
    };
    lines.push(format!(
        "{} tickets ({source}, fetched {})",
        collection.len(),
        collection.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_ticket_plus_summary() {
        let lines = render_lines(&TicketCollection::unavailable());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("INFRA-OFFLINE"));
        assert!(lines[1].starts_with("1 tickets (fallback"));
    }
}
